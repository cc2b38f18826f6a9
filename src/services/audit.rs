use rusqlite::Connection;
use std::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::AppError;

/// Append-only record of who uploaded what. A collaborator of the core:
/// the session store owns quota enforcement, this table only keeps the
/// durable trail.
pub struct FileAudit {
    conn: Mutex<Connection>,
}

impl FileAudit {
    pub fn open(path: &str) -> Result<Self, AppError> {
        info!("Opening file audit database at {}", path);
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open audit database: {}", e);
            AppError::DatabaseError(e.to_string())
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT,
                created_at TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                filename TEXT,
                uploaded_at TEXT,
                FOREIGN KEY(user_id) REFERENCES users(id)
            )",
            [],
        )?;

        debug!("Audit schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn log_user(&self, user_id: i64, username: Option<&str>) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id, username, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn log_file(&self, user_id: i64, filename: &str) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (user_id, filename, uploaded_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id, filename, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn file_count(&self, user_id: i64) -> Result<i64, AppError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_user_files(&self, user_id: i64) -> Result<(), AppError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM files WHERE user_id = ?1", [user_id])?;
        info!("Deleted {} audit file rows for user {}", deleted, user_id);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, AppError> {
        self.conn.lock().map_err(|e| {
            error!("Failed to acquire audit database lock: {}", e);
            AppError::DatabaseError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> FileAudit {
        FileAudit::open(":memory:").unwrap()
    }

    #[test]
    fn logs_and_counts_files_per_user() {
        let audit = in_memory();
        audit.log_user(1, Some("alice")).unwrap();
        audit.log_file(1, "a.xlsx").unwrap();
        audit.log_file(1, "b.xlsx").unwrap();
        audit.log_file(2, "c.xlsx").unwrap();

        assert_eq!(audit.file_count(1).unwrap(), 2);
        assert_eq!(audit.file_count(2).unwrap(), 1);
    }

    #[test]
    fn delete_only_touches_the_given_user() {
        let audit = in_memory();
        audit.log_file(1, "a.xlsx").unwrap();
        audit.log_file(2, "c.xlsx").unwrap();

        audit.delete_user_files(1).unwrap();
        assert_eq!(audit.file_count(1).unwrap(), 0);
        assert_eq!(audit.file_count(2).unwrap(), 1);
    }

    #[test]
    fn repeated_user_log_is_ignored() {
        let audit = in_memory();
        audit.log_user(1, Some("alice")).unwrap();
        audit.log_user(1, Some("renamed")).unwrap();

        let conn = audit.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
