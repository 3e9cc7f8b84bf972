use thiserror::Error;

use crate::job::ItemStatus;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    #[error("Archive failed: {0}")]
    Archive(String),
}
