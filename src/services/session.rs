use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::SessionError;
use crate::models::{NormalizedRow, SourceTable};

/// Per-user session lifecycle. `Collecting` holds the tables uploaded so
/// far; `AwaitingDetail` holds the raw snapshot that survives a delivered
/// combined report to serve exactly one detailed-aggregation request.
#[derive(Debug)]
enum SessionState {
    Empty,
    Collecting { tables: Vec<SourceTable> },
    AwaitingDetail { raw_snapshot: Vec<SourceTable> },
}

/// Owns all per-user session state, keyed strictly by user_id. Cross-user
/// isolation is structural: no operation can observe another user's entry.
pub struct SessionManager {
    quota: usize,
    sessions: Mutex<HashMap<i64, SessionState>>,
}

impl SessionManager {
    pub fn new(quota: usize) -> Self {
        Self {
            quota,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Store a normalized table, preserving upload order. A new source_id is
    /// gated by the quota; re-uploading an existing source_id overwrites the
    /// earlier entry in place (last-write-wins, position preserved) and is
    /// not charged against the quota. Returns the resulting source count.
    pub fn add_source(
        &self,
        user_id: i64,
        source_id: String,
        rows: Vec<NormalizedRow>,
    ) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.lock();
        let state = sessions.entry(user_id).or_insert(SessionState::Empty);

        // Uploading after a report starts a fresh session; the stale
        // snapshot is discarded.
        if matches!(state, SessionState::AwaitingDetail { .. }) {
            *state = SessionState::Empty;
        }

        match state {
            SessionState::Empty => {
                if self.quota == 0 {
                    return Err(SessionError::QuotaExceeded(self.quota));
                }
                *state = SessionState::Collecting {
                    tables: vec![SourceTable { source_id, rows }],
                };
                Ok(1)
            }
            SessionState::Collecting { tables } => {
                if let Some(existing) = tables.iter_mut().find(|t| t.source_id == source_id) {
                    tracing::info!("Overwriting previously uploaded source {}", source_id);
                    existing.rows = rows;
                } else {
                    if tables.len() >= self.quota {
                        return Err(SessionError::QuotaExceeded(self.quota));
                    }
                    tables.push(SourceTable { source_id, rows });
                }
                Ok(tables.len())
            }
            SessionState::AwaitingDetail { .. } => unreachable!("cleared above"),
        }
    }

    pub fn count(&self, user_id: i64) -> usize {
        match self.sessions.lock().get(&user_id) {
            Some(SessionState::Collecting { tables }) => tables.len(),
            _ => 0,
        }
    }

    /// Deep copy of the stored tables, for readers that must not alias
    /// mutable session state. Empty when not collecting.
    pub fn snapshot(&self, user_id: i64) -> Vec<SourceTable> {
        match self.sessions.lock().get(&user_id) {
            Some(SessionState::Collecting { tables }) => tables.clone(),
            _ => Vec::new(),
        }
    }

    /// Unconditional transition to `Empty`, dropping tables and any
    /// surviving raw snapshot. Idempotent. Never waits on in-flight
    /// readers: they hold detached copies.
    pub fn reset(&self, user_id: i64) {
        self.sessions.lock().remove(&user_id);
    }

    /// Hand the session's tables to a report builder and clear them, while
    /// retaining a raw snapshot for one subsequent detailed request.
    pub fn consume(&self, user_id: i64) -> Result<Vec<SourceTable>, SessionError> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&user_id) {
            Some(state @ SessionState::Collecting { .. }) => {
                let SessionState::Collecting { tables } =
                    std::mem::replace(state, SessionState::Empty)
                else {
                    unreachable!("matched Collecting above");
                };
                *state = SessionState::AwaitingDetail {
                    raw_snapshot: tables.clone(),
                };
                Ok(tables)
            }
            _ => Err(SessionError::EmptySession),
        }
    }

    /// One-shot: returns the retained raw snapshot and destroys it. A
    /// second take, or a take after reset, fails with `StaleSnapshot`.
    pub fn take_raw_snapshot(&self, user_id: i64) -> Result<Vec<SourceTable>, SessionError> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&user_id) {
            Some(state @ SessionState::AwaitingDetail { .. }) => {
                let SessionState::AwaitingDetail { raw_snapshot } =
                    std::mem::replace(state, SessionState::Empty)
                else {
                    unreachable!("matched AwaitingDetail above");
                };
                Ok(raw_snapshot)
            }
            _ => Err(SessionError::StaleSnapshot),
        }
    }

    /// Drop the retained raw snapshot without producing a report. Leaves a
    /// collecting session untouched.
    pub fn clear_raw_snapshot(&self, user_id: i64) {
        let mut sessions = self.sessions.lock();
        if let Some(state @ SessionState::AwaitingDetail { .. }) = sessions.get_mut(&user_id) {
            *state = SessionState::Empty;
        }
    }
}
