use serde::Deserialize;
use anyhow::Result;
use dotenvy::dotenv;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub max_file_size: usize,
    pub max_sources_per_user: usize,
    pub audit_db_path: String,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let max_sources_per_user = std::env::var("MAX_SOURCES_PER_USER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let max_file_size = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10 * 1024 * 1024); // 10MB

        let audit_db_path = std::env::var("AUDIT_DB_PATH")
            .unwrap_or_else(|_| "files_audit.sqlite".to_string());

        Ok(Config {
            max_file_size,
            max_sources_per_user,
            audit_db_path,
        })
    }
}
