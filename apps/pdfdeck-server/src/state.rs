//! Shared application state

use std::sync::Arc;

use pdfdeck_history::HistoryStore;
use tokio::sync::Mutex;

use crate::remote::BackendClient;

#[derive(Clone)]
pub struct AppState {
    /// Operation history, shared by all handlers
    pub history: Arc<Mutex<HistoryStore>>,
    /// Remote OCR backend, if configured
    pub ocr: Option<Arc<BackendClient>>,
    /// Remote compression backend, if configured
    pub compressor: Option<Arc<BackendClient>>,
    /// Decoded upload size limit per file
    pub max_file_bytes: usize,
}
