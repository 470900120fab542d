use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::attachment::AttachmentRef;

/// Values read from a receipt by the extraction provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    pub amount: Decimal,
    /// Calendar date of the receipt; time-of-day is never considered.
    pub issued_on: NaiveDate,
}

/// Failures local to document validation. These are recorded on the
/// validation result and never surface through the status machine.
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("receipt could not be read: {0}")]
    Unreadable(String),

    #[error("extraction timed out")]
    Timeout,

    #[error("extraction provider failure: {0}")]
    Provider(String),
}

/// Replaceable OCR/extraction capability.
///
/// Implementations are best-effort and advisory; the workflow never blocks
/// on them. Tests swap in a stub.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, receipt: &AttachmentRef) -> Result<ExtractedReceipt, ExtractionError>;
}
