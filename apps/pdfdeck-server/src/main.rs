//! PDF Deck server
//!
//! REST surface for the PDF Deck document tools. Every tool the suite
//! offers is an endpoint: merge, split, page edits, watermarking,
//! compression, metadata, image conversion, OCR proxying, and batch runs
//! over many files. Provides:
//!
//! - Rate limiting via tower-governor
//! - Per-file upload limits
//! - Operation history persisted to disk
//! - Optional remote OCR/compression backends with a bounded retry policy

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::sync::Mutex;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod remote;
mod state;

use api::{
    handle_annotate, handle_batch, handle_compress, handle_convert_images, handle_delete_pages,
    handle_health, handle_history, handle_list_tools, handle_merge, handle_metadata_read,
    handle_metadata_write, handle_ocr, handle_recent_tools, handle_reorder, handle_rotate,
    handle_split, handle_watermark,
};
use pdfdeck_history::{HistoryStore, DEFAULT_CAP};
use remote::BackendClient;
use state::AppState;

/// Command-line arguments for the PDF Deck server
#[derive(Parser, Debug)]
#[command(name = "pdfdeck-server")]
#[command(about = "PDF Deck server - REST surface for the document tools")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Per-file upload limit in megabytes
    #[arg(long, default_value = "50")]
    max_file_mb: usize,

    /// Path of the operation history file
    #[arg(long, default_value = "pdfdeck-history.json")]
    history_path: String,

    /// Maximum retained history entries
    #[arg(long, default_value_t = DEFAULT_CAP)]
    history_cap: usize,

    /// Base URL of the remote OCR backend (optional)
    #[arg(long)]
    ocr_url: Option<String>,

    /// Base URL of the remote compression backend (optional)
    #[arg(long)]
    compress_url: Option<String>,

    /// Timeout for remote backend requests, in milliseconds
    #[arg(long, default_value = "15000")]
    backend_timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF Deck server on {}:{}", args.host, args.port);

    let history = HistoryStore::open(&args.history_path, args.history_cap)?;

    let backend_timeout = Duration::from_millis(args.backend_timeout_ms);
    let ocr = args
        .ocr_url
        .as_deref()
        .map(|url| BackendClient::new(url, backend_timeout))
        .transpose()?
        .map(Arc::new);
    let compressor = args
        .compress_url
        .as_deref()
        .map(|url| BackendClient::new(url, backend_timeout))
        .transpose()?
        .map(Arc::new);

    if ocr.is_some() {
        info!("OCR backend: {}", args.ocr_url.as_deref().unwrap_or(""));
    }
    if compressor.is_some() {
        info!(
            "Compression backend: {}",
            args.compress_url.as_deref().unwrap_or("")
        );
    }

    let state = AppState {
        history: Arc::new(Mutex::new(history)),
        ocr,
        compressor,
        max_file_bytes: args.max_file_mb * 1024 * 1024,
    };

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .expect("Failed to create rate limiter config"),
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Tool catalogue
        .route("/api/tools", get(handle_list_tools))
        // Document tools
        .route("/api/merge", post(handle_merge))
        .route("/api/split", post(handle_split))
        .route("/api/delete-pages", post(handle_delete_pages))
        .route("/api/rotate", post(handle_rotate))
        .route("/api/reorder", post(handle_reorder))
        .route("/api/watermark", post(handle_watermark))
        .route("/api/annotate", post(handle_annotate))
        .route("/api/compress", post(handle_compress))
        .route("/api/metadata/read", post(handle_metadata_read))
        .route("/api/metadata/write", post(handle_metadata_write))
        .route("/api/convert/images", post(handle_convert_images))
        .route("/api/ocr", post(handle_ocr))
        // Batch mode
        .route("/api/batch", post(handle_batch))
        // History
        .route("/api/history", get(handle_history))
        .route("/api/history/tools", get(handle_recent_tools))
        // Apply middleware
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors)
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Upload limit: {} MB per file", args.max_file_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
