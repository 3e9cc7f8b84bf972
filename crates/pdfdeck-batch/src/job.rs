//! Per-file batch state
//!
//! Each input file owns one `BatchItem`. Status only ever moves forward:
//! Pending -> Processing -> Completed | Failed. The runner is the only
//! writer, and `advance` is the only mutation path, so a regression is a
//! programming error surfaced as `BatchError::InvalidTransition`.

use serde::Serialize;

use crate::error::BatchError;

/// Lifecycle of one file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Forward-only transition check.
    pub fn can_become(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

/// UI-facing state of one file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub name: String,
    pub status: ItemStatus,
    /// 0-100, monotonically non-decreasing
    pub progress: u8,
    pub error: Option<String>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::Pending,
            progress: 0,
            error: None,
        }
    }

    /// Move to the next status; rejects any non-forward transition.
    pub fn advance(&mut self, next: ItemStatus) -> Result<(), BatchError> {
        if !self.status.can_become(next) {
            return Err(BatchError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next == ItemStatus::Completed {
            self.progress = 100;
        }
        Ok(())
    }

    /// Record item-local progress; never decreases.
    pub fn set_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), BatchError> {
        self.advance(ItemStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_pending() {
        let item = BatchItem::new("a.pdf");
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.progress, 0);
        assert!(item.error.is_none());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        let mut item = BatchItem::new("a.pdf");
        item.advance(ItemStatus::Processing).unwrap();
        item.advance(ItemStatus::Completed).unwrap();
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_backward_transitions_rejected() {
        let mut item = BatchItem::new("a.pdf");
        item.advance(ItemStatus::Processing).unwrap();
        item.advance(ItemStatus::Completed).unwrap();
        assert!(item.advance(ItemStatus::Processing).is_err());
        assert!(item.advance(ItemStatus::Pending).is_err());
    }

    #[test]
    fn test_skipping_processing_rejected() {
        let mut item = BatchItem::new("a.pdf");
        assert!(item.advance(ItemStatus::Completed).is_err());
        assert!(item.advance(ItemStatus::Failed).is_err());
    }

    #[test]
    fn test_fail_records_error() {
        let mut item = BatchItem::new("a.pdf");
        item.advance(ItemStatus::Processing).unwrap();
        item.fail("boom").unwrap();
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut item = BatchItem::new("a.pdf");
        item.set_progress(60);
        item.set_progress(30);
        assert_eq!(item.progress, 60);
        item.set_progress(200);
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ItemStatus::Completed.is_terminal());
        assert!(ItemStatus::Failed.is_terminal());
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(!ItemStatus::Processing.is_terminal());
    }
}
