use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::{audit::FileAudit, session::SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;

    // Build our application state
    let state = Arc::new(AppState::new(config)?);

    // Build our application with a route
    let app = Router::new()
        .merge(routes::sheets::routes())
        .with_state(state);

    // Run it
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    sessions: SessionManager,
    audit: FileAudit,
}

impl AppState {
    fn new(config: config::Config) -> Result<Self> {
        let sessions = SessionManager::new(config.max_sources_per_user);
        let audit = FileAudit::open(&config.audit_db_path)?;
        Ok(Self {
            config,
            sessions,
            audit,
        })
    }
}
