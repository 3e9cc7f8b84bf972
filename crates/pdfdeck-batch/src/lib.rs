//! Batch processing harness
//!
//! Runs one tool operation across many files, sequentially, with
//! pause/resume and stop observed between files, per-item status and
//! progress reporting, and ZIP packaging of the outputs.

pub mod archive;
pub mod error;
pub mod job;
pub mod runner;

pub use archive::zip_outputs;
pub use error::BatchError;
pub use job::{BatchItem, ItemStatus};
pub use runner::{
    BatchEvent, BatchHandle, BatchInput, BatchOutput, BatchReport, BatchRunner, ItemProgress,
};
