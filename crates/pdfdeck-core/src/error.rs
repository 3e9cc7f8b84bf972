use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}
