//! Clients for optional remote backends (OCR, compression)
//!
//! Outbound calls carry an explicit contract: a per-request timeout and a
//! bounded exponential backoff. 5xx responses and transport failures are
//! retried; 4xx responses fail immediately.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Total attempts per request (initial + retries).
const ATTEMPTS: u32 = 3;

/// First retry delay; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,

    #[error("backend returned {0}: {1}")]
    Status(u16, String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Decode(String),
}

/// HTTP client for one configured backend service.
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Send a document for text recognition; returns the recognized text.
    pub async fn ocr(&self, filename: &str, bytes: &[u8]) -> Result<String, BackendError> {
        #[derive(Deserialize)]
        struct OcrResponse {
            text: String,
        }

        let body = json!({
            "filename": filename,
            "data": BASE64.encode(bytes),
        });

        let value = self.post_with_retry("/recognize", &body).await?;
        let parsed: OcrResponse =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(parsed.text)
    }

    /// Send a document for compression; returns the compressed bytes.
    pub async fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, BackendError> {
        #[derive(Deserialize)]
        struct CompressResponse {
            data: String,
        }

        let body = json!({ "data": BASE64.encode(bytes) });

        let value = self.post_with_retry("/compress", &body).await?;
        let parsed: CompressResponse =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        BASE64
            .decode(parsed.data)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn post_with_retry(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = BackendError::Transport("no attempt made".into());

        for attempt in 0..ATTEMPTS {
            if attempt > 0 {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                debug!(?delay, attempt, url = %url, "retrying backend request");
                tokio::time::sleep(delay).await;
            }

            match self.http.post(&url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json()
                            .await
                            .map_err(|e| BackendError::Decode(e.to_string()));
                    }

                    let text = resp.text().await.unwrap_or_default();
                    if status.is_client_error() {
                        // Our request is wrong; retrying cannot help
                        return Err(BackendError::Status(status.as_u16(), text));
                    }
                    warn!(status = status.as_u16(), attempt, "backend returned server error");
                    last_error = BackendError::Status(status.as_u16(), text);
                }
                Err(e) if e.is_timeout() => {
                    warn!(attempt, url = %url, "backend request timed out");
                    last_error = BackendError::Timeout;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "backend request failed");
                    last_error = BackendError::Transport(e.to_string());
                }
            }
        }

        Err(last_error)
    }
}

impl From<BackendError> for crate::error::ServerError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout => Self::Timeout,
            other => Self::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            BackendClient::new("http://localhost:9000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_backend_error_maps_to_server_error() {
        use crate::error::ServerError;

        let timeout: ServerError = BackendError::Timeout.into();
        assert_eq!(timeout.code(), "TIMEOUT");

        let status: ServerError = BackendError::Status(500, "oops".into()).into();
        assert_eq!(status.code(), "BACKEND_ERROR");
    }
}
