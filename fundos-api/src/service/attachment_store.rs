use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::attachment::AttachmentRef;

/// Resolved attachment metadata, including a retrieval URL minted by the
/// blob service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub name: String,
    pub size_bytes: u64,
    pub url: String,
}

/// Opaque blob-URL service.
///
/// The core stores only (name, size) references; this collaborator turns a
/// reference into something a browser can fetch.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn resolve(
        &self,
        reference: &AttachmentRef,
    ) -> Result<AttachmentInfo, Box<dyn std::error::Error + Send + Sync>>;
}
