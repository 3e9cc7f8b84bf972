//! API handlers for the PDF Deck server
//!
//! Every tool takes and returns JSON with base64 document payloads; the
//! front-end turns those into file downloads. CPU-bound PDF work runs on
//! the blocking pool so the reactor stays responsive.

use axum::{
    extract::{Query, State},
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pdfdeck_batch::{zip_outputs, BatchInput, BatchOutput, BatchRunner};
use pdfdeck_core::{
    output_name, DocumentMetadata, EditLog, MergeInput, WatermarkSpec,
};
use pdfdeck_history::HistoryEntry;

use crate::error::ServerError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Shared payload types

/// One uploaded file: display name plus base64 content.
#[derive(Debug, Clone, Deserialize)]
pub struct FilePayload {
    pub name: String,
    /// Base64-encoded file content
    pub data: String,
}

/// One produced file in a response.
#[derive(Serialize)]
pub struct FileResult {
    pub name: String,
    pub data: String,
}

/// Standard single-document response.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub filename: String,
    /// Base64-encoded PDF
    pub data: String,
    pub page_count: u32,
    pub size_bytes: usize,
}

fn decode_payload(state: &AppState, file: &FilePayload) -> Result<Vec<u8>, ServerError> {
    let bytes = BASE64
        .decode(&file.data)
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid base64 in '{}': {}", file.name, e)))?;

    if bytes.len() > state.max_file_bytes {
        return Err(ServerError::InvalidRequest(format!(
            "'{}' exceeds the {} MB upload limit",
            file.name,
            state.max_file_bytes / (1024 * 1024)
        )));
    }
    Ok(bytes)
}

/// Run a CPU-bound closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("Worker task failed: {}", e)))?
}

async fn record_history(
    state: &AppState,
    tool: &str,
    filename: &str,
    output: &[u8],
) {
    // History is best-effort; a failed write never fails the request
    let mut history = state.history.lock().await;
    if let Err(e) = history.record(tool, filename, output) {
        warn!(tool, error = %e, "failed to record history entry");
    }
}

fn document_response(filename: String, bytes: Vec<u8>, page_count: u32) -> DocumentResponse {
    DocumentResponse {
        success: true,
        size_bytes: bytes.len(),
        data: BASE64.encode(&bytes),
        filename,
        page_count,
    }
}

// ---------------------------------------------------------------------------
// Health and catalogue

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfdeck-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ToolInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Whether the tool is available through /api/batch
    pub batch: bool,
}

#[derive(Serialize)]
pub struct ToolsResponse {
    pub success: bool,
    pub tools: Vec<ToolInfo>,
    pub count: usize,
}

/// Handler: GET /api/tools
pub async fn handle_list_tools() -> Json<ToolsResponse> {
    let tools = vec![
        ToolInfo {
            id: "merge",
            name: "Merge PDFs",
            description: "Combine multiple PDFs into one document",
            batch: false,
        },
        ToolInfo {
            id: "split",
            name: "Split PDF",
            description: "Extract pages or split into multiple documents",
            batch: false,
        },
        ToolInfo {
            id: "delete-pages",
            name: "Delete pages",
            description: "Remove pages from a document",
            batch: false,
        },
        ToolInfo {
            id: "rotate",
            name: "Rotate pages",
            description: "Rotate pages by 90, 180 or 270 degrees",
            batch: true,
        },
        ToolInfo {
            id: "reorder",
            name: "Reorder pages",
            description: "Rearrange the pages of a document",
            batch: false,
        },
        ToolInfo {
            id: "watermark",
            name: "Watermark",
            description: "Stamp text across every page, centered or tiled",
            batch: true,
        },
        ToolInfo {
            id: "annotate",
            name: "Edit",
            description: "Add text, highlights and redactions",
            batch: false,
        },
        ToolInfo {
            id: "compress",
            name: "Compress",
            description: "Reduce file size by recompressing content",
            batch: true,
        },
        ToolInfo {
            id: "metadata",
            name: "Metadata",
            description: "Read or update title, author, subject, keywords",
            batch: false,
        },
        ToolInfo {
            id: "convert-images",
            name: "Images to PDF",
            description: "Build a PDF from JPEG and PNG images",
            batch: false,
        },
        ToolInfo {
            id: "ocr",
            name: "OCR",
            description: "Recognize text via the configured OCR backend",
            batch: false,
        },
    ];

    let count = tools.len();
    Json(ToolsResponse {
        success: true,
        tools,
        count,
    })
}

// ---------------------------------------------------------------------------
// Merge

#[derive(Deserialize)]
pub struct MergeFile {
    #[serde(flatten)]
    pub file: FilePayload,
    /// Optional page selection like "1-3, 5"
    #[serde(default)]
    pub pages: Option<String>,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub files: Vec<MergeFile>,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

/// Handler: POST /api/merge
pub async fn handle_merge(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    if req.files.len() < 2 {
        return Err(ServerError::InvalidRequest(
            "Merge needs at least two files".into(),
        ));
    }
    info!(files = req.files.len(), "merge request");

    let first_name = req.files[0].file.name.clone();

    let mut inputs = Vec::with_capacity(req.files.len());
    for f in &req.files {
        let bytes = decode_payload(&state, &f.file)?;
        let pages = match &f.pages {
            Some(ranges) => Some(pdfdeck_core::parse_ranges(ranges)?),
            None => None,
        };
        inputs.push(MergeInput { bytes, pages });
    }

    let metadata = req.metadata.unwrap_or_default();
    let (bytes, page_count) = blocking(move || {
        let bytes = pdfdeck_core::merge(inputs, &metadata)?;
        let pages = pdfdeck_core::get_page_count(&bytes)?;
        Ok((bytes, pages))
    })
    .await?;

    let filename = output_name(&first_name, "-merged", "pdf");
    record_history(&state, "merge", &filename, &bytes).await;

    Ok(Json(document_response(filename, bytes, page_count)))
}

// ---------------------------------------------------------------------------
// Split / delete / rotate / reorder

#[derive(Deserialize)]
pub struct SplitRequest {
    pub file: FilePayload,
    /// Selection like "1-3, 5, 8-10"
    pub ranges: String,
    /// False: one document with the selected pages.
    /// True: one document per comma-separated part.
    #[serde(default)]
    pub parts: bool,
}

#[derive(Serialize)]
pub struct MultiDocumentResponse {
    pub success: bool,
    pub files: Vec<FileResult>,
    pub count: usize,
}

/// Handler: POST /api/split
pub async fn handle_split(
    State(state): State<AppState>,
    Json(req): Json<SplitRequest>,
) -> Result<axum::response::Response, ServerError> {
    use axum::response::IntoResponse;

    let bytes = decode_payload(&state, &req.file)?;
    let name = req.file.name.clone();
    info!(name = %name, ranges = %req.ranges, parts = req.parts, "split request");

    if req.parts {
        // Each comma-separated part becomes its own output document
        let selections: Vec<Vec<u32>> = req
            .ranges
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(pdfdeck_core::parse_ranges)
            .collect::<Result<_, _>>()?;

        let parts = blocking(move || {
            Ok(pdfdeck_core::split_into_parts(&bytes, &selections)?)
        })
        .await?;

        let files: Vec<FileResult> = parts
            .iter()
            .enumerate()
            .map(|(i, part)| FileResult {
                name: output_name(&name, &format!("-part{}", i + 1), "pdf"),
                data: BASE64.encode(part),
            })
            .collect();

        for (file, part) in files.iter().zip(&parts) {
            record_history(&state, "split", &file.name, part).await;
        }

        let count = files.len();
        return Ok(Json(MultiDocumentResponse {
            success: true,
            files,
            count,
        })
        .into_response());
    }

    let pages = pdfdeck_core::parse_ranges(&req.ranges)?;
    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::extract_pages(&bytes, pages)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&name, "-extracted", "pdf");
    record_history(&state, "split", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)).into_response())
}

#[derive(Deserialize)]
pub struct DeletePagesRequest {
    pub file: FilePayload,
    pub pages: String,
}

/// Handler: POST /api/delete-pages
pub async fn handle_delete_pages(
    State(state): State<AppState>,
    Json(req): Json<DeletePagesRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let pages = pdfdeck_core::parse_ranges(&req.pages)?;

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::delete_pages(&bytes, pages)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "-edited", "pdf");
    record_history(&state, "delete-pages", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

#[derive(Deserialize)]
pub struct RotateRequest {
    pub file: FilePayload,
    /// 90, 180 or 270 (clockwise)
    pub degrees: i32,
    /// Optional selection; omitted rotates every page
    #[serde(default)]
    pub pages: Option<String>,
}

/// Handler: POST /api/rotate
pub async fn handle_rotate(
    State(state): State<AppState>,
    Json(req): Json<RotateRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let pages = match &req.pages {
        Some(ranges) => Some(pdfdeck_core::parse_ranges(ranges)?),
        None => None,
    };
    let degrees = req.degrees;

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::rotate_pages(&bytes, pages, degrees)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "-rotated", "pdf");
    record_history(&state, "rotate", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub file: FilePayload,
    /// Complete permutation of the current 1-indexed page numbers
    pub order: Vec<u32>,
}

/// Handler: POST /api/reorder
pub async fn handle_reorder(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let order = req.order.clone();

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::reorder_pages(&bytes, &order)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "-reordered", "pdf");
    record_history(&state, "reorder", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

// ---------------------------------------------------------------------------
// Watermark / annotate

#[derive(Deserialize)]
pub struct WatermarkRequest {
    pub file: FilePayload,
    pub watermark: WatermarkSpec,
}

/// Handler: POST /api/watermark
pub async fn handle_watermark(
    State(state): State<AppState>,
    Json(req): Json<WatermarkRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let spec = req.watermark.clone();

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::watermark(&bytes, &spec)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "-watermarked", "pdf");
    record_history(&state, "watermark", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

#[derive(Deserialize)]
pub struct AnnotateRequest {
    pub file: FilePayload,
    pub operations: EditLog,
}

/// Handler: POST /api/annotate
pub async fn handle_annotate(
    State(state): State<AppState>,
    Json(req): Json<AnnotateRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let log = req.operations.clone();

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::apply_edits(&bytes, &log)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "-edited", "pdf");
    record_history(&state, "annotate", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

// ---------------------------------------------------------------------------
// Compress

#[derive(Deserialize)]
pub struct CompressRequest {
    pub file: FilePayload,
}

#[derive(Debug, Serialize)]
pub struct CompressResponse {
    pub success: bool,
    pub filename: String,
    pub data: String,
    pub input_size: usize,
    pub output_size: usize,
    pub reduced: bool,
}

/// Handler: POST /api/compress
///
/// Tries the configured compression backend first (when it helps), and
/// always falls back to local recompression.
pub async fn handle_compress(
    State(state): State<AppState>,
    Json(req): Json<CompressRequest>,
) -> Result<Json<CompressResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let filename = output_name(&req.file.name, "-compressed", "pdf");

    if let Some(backend) = &state.compressor {
        match backend.compress(&bytes).await {
            Ok(remote) if remote.len() < bytes.len() => {
                info!(
                    input = bytes.len(),
                    output = remote.len(),
                    "remote compression accepted"
                );
                record_history(&state, "compress", &filename, &remote).await;
                return Ok(Json(CompressResponse {
                    success: true,
                    filename,
                    input_size: bytes.len(),
                    output_size: remote.len(),
                    data: BASE64.encode(&remote),
                    reduced: true,
                }));
            }
            Ok(_) => info!("remote compression did not shrink the file, using local"),
            Err(e) => warn!(error = %e, "compression backend failed, using local"),
        }
    }

    let outcome = blocking(move || Ok(pdfdeck_core::compress(&bytes)?)).await?;

    record_history(&state, "compress", &filename, &outcome.bytes).await;

    Ok(Json(CompressResponse {
        success: true,
        filename,
        input_size: outcome.input_size,
        output_size: outcome.output_size,
        data: BASE64.encode(&outcome.bytes),
        reduced: outcome.reduced,
    }))
}

// ---------------------------------------------------------------------------
// Metadata

#[derive(Deserialize)]
pub struct MetadataReadRequest {
    pub file: FilePayload,
}

#[derive(Serialize)]
pub struct MetadataReadResponse {
    pub success: bool,
    pub metadata: DocumentMetadata,
}

/// Handler: POST /api/metadata/read
pub async fn handle_metadata_read(
    State(state): State<AppState>,
    Json(req): Json<MetadataReadRequest>,
) -> Result<Json<MetadataReadResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;

    let metadata = blocking(move || Ok(pdfdeck_core::read_metadata(&bytes)?)).await?;

    Ok(Json(MetadataReadResponse {
        success: true,
        metadata,
    }))
}

#[derive(Deserialize)]
pub struct MetadataWriteRequest {
    pub file: FilePayload,
    pub metadata: DocumentMetadata,
}

/// Handler: POST /api/metadata/write
pub async fn handle_metadata_write(
    State(state): State<AppState>,
    Json(req): Json<MetadataWriteRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    let bytes = decode_payload(&state, &req.file)?;
    let metadata = req.metadata.clone();

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::set_metadata(&bytes, &metadata)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&req.file.name, "", "pdf");
    record_history(&state, "metadata", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

// ---------------------------------------------------------------------------
// Conversion

#[derive(Deserialize)]
pub struct ConvertImagesRequest {
    pub images: Vec<FilePayload>,
}

/// Handler: POST /api/convert/images
pub async fn handle_convert_images(
    State(state): State<AppState>,
    Json(req): Json<ConvertImagesRequest>,
) -> Result<Json<DocumentResponse>, ServerError> {
    if req.images.is_empty() {
        return Err(ServerError::InvalidRequest("No images supplied".into()));
    }

    let first_name = req.images[0].name.clone();
    let mut decoded = Vec::with_capacity(req.images.len());
    for image in &req.images {
        decoded.push(decode_payload(&state, image)?);
    }

    let (out, page_count) = blocking(move || {
        let out = pdfdeck_core::images_to_pdf(&decoded)?;
        let pages = pdfdeck_core::get_page_count(&out)?;
        Ok((out, pages))
    })
    .await?;

    let filename = output_name(&first_name, "", "pdf");
    record_history(&state, "convert-images", &filename, &out).await;

    Ok(Json(document_response(filename, out, page_count)))
}

// ---------------------------------------------------------------------------
// OCR (remote backend)

#[derive(Deserialize)]
pub struct OcrRequest {
    pub file: FilePayload,
}

#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
}

/// Handler: POST /api/ocr
pub async fn handle_ocr(
    State(state): State<AppState>,
    Json(req): Json<OcrRequest>,
) -> Result<Json<OcrResponse>, ServerError> {
    let backend = state
        .ocr
        .as_ref()
        .ok_or(ServerError::BackendUnavailable("OCR"))?;

    let bytes = decode_payload(&state, &req.file)?;
    pdfdeck_core::quick_validate(&bytes)?;

    let text = backend.ocr(&req.file.name, &bytes).await?;

    Ok(Json(OcrResponse {
        success: true,
        text,
    }))
}

// ---------------------------------------------------------------------------
// Batch

/// Tools available in batch mode, with their options.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum BatchTool {
    Rotate {
        degrees: i32,
    },
    Watermark {
        watermark: WatermarkSpec,
    },
    Compress,
}

impl BatchTool {
    fn id(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "rotate",
            Self::Watermark { .. } => "watermark",
            Self::Compress => "compress",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "-rotated",
            Self::Watermark { .. } => "-watermarked",
            Self::Compress => "-compressed",
        }
    }

    fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>, pdfdeck_core::DeckError> {
        match self {
            Self::Rotate { degrees } => pdfdeck_core::rotate_pages(bytes, None, *degrees),
            Self::Watermark { watermark } => pdfdeck_core::watermark(bytes, watermark),
            Self::Compress => Ok(pdfdeck_core::compress(bytes)?.bytes),
        }
    }
}

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(flatten)]
    pub tool: BatchTool,
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub items: Vec<pdfdeck_batch::BatchItem>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Base64 ZIP of all outputs; absent when nothing succeeded
    pub archive: Option<String>,
    pub archive_name: Option<String>,
}

/// Handler: POST /api/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ServerError> {
    if req.files.is_empty() {
        return Err(ServerError::InvalidRequest("No files supplied".into()));
    }
    info!(tool = req.tool.id(), files = req.files.len(), "batch request");

    let mut inputs = Vec::with_capacity(req.files.len());
    for file in &req.files {
        let bytes = decode_payload(&state, file)?;
        inputs.push(BatchInput::new(&file.name, bytes));
    }

    let tool = req.tool.clone();
    let (runner, _handle) = BatchRunner::new();
    let report = runner
        .run(inputs, move |input, _progress| {
            let tool = tool.clone();
            async move {
                tokio::task::spawn_blocking(move || tool.apply(&input.bytes))
                    .await
                    .map_err(|e| format!("Worker task failed: {}", e))?
                    .map_err(|e| e.to_string())
            }
        })
        .await;

    // Rename outputs to their download names before packaging
    let outputs: Vec<BatchOutput> = report
        .outputs
        .iter()
        .map(|o| BatchOutput {
            name: output_name(&o.name, req.tool.suffix(), "pdf"),
            bytes: o.bytes.clone(),
        })
        .collect();

    let (archive, archive_name) = if outputs.is_empty() {
        (None, None)
    } else {
        let zipped = blocking(move || {
            zip_outputs(&outputs).map_err(|e| ServerError::Internal(e.to_string()))
        })
        .await?;
        let name = format!("batch-{}.zip", req.tool.id());
        record_history(&state, req.tool.id(), &name, &zipped).await;
        (Some(BASE64.encode(&zipped)), Some(name))
    };

    Ok(Json(BatchResponse {
        success: true,
        total: report.total(),
        completed: report.completed(),
        failed: report.failed(),
        items: report.items,
        archive,
        archive_name,
    }))
}

// ---------------------------------------------------------------------------
// History

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub entries: Vec<HistoryEntry>,
    pub count: usize,
}

/// Handler: GET /api/history
pub async fn handle_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let history = state.history.lock().await;
    let entries: Vec<HistoryEntry> = history
        .recent(query.limit)
        .into_iter()
        .cloned()
        .collect();
    let count = entries.len();

    Json(HistoryResponse {
        success: true,
        entries,
        count,
    })
}

#[derive(Serialize)]
pub struct RecentToolsResponse {
    pub success: bool,
    pub tools: Vec<String>,
}

/// Handler: GET /api/history/tools
pub async fn handle_recent_tools(State(state): State<AppState>) -> Json<RecentToolsResponse> {
    let history = state.history.lock().await;
    Json(RecentToolsResponse {
        success: true,
        tools: history.recent_tools().to_vec(),
    })
}
