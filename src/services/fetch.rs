use bytes::Bytes;
use reqwest::Client;

use crate::error::AppError;

/// Retrieve an uploaded blob from the transport's signed URL. The core
/// never sees the network; callers hand it the returned bytes.
pub async fn load_file_from_url(url: &str) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::DownloadError(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::DownloadError(format!(
            "Failed to fetch file. Status: {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::DownloadError(format!("Failed to read response bytes: {}", e)))
}
