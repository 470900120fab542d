use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};

/// Opaque descriptor for an uploaded file.
///
/// The core never inspects file bytes; receipts and supporting documents are
/// carried as (name, size) references resolved by the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: HeaplessString<255>,
    pub size_bytes: u64,
}

impl AttachmentRef {
    pub fn new(name: &str, size_bytes: u64) -> WorkflowResult<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(WorkflowError::ValidationError(
                "attachment name must not be empty".to_string(),
            ));
        }
        let name = HeaplessString::try_from(trimmed).map_err(|_| {
            WorkflowError::ValidationError("attachment name exceeds 255 characters".to_string())
        })?;
        Ok(Self { name, size_bytes })
    }
}
