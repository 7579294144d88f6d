//! Attachment enrichment for graph nodes. Best-effort: never fails a build.

mod fts;

pub use fts::{normalize_bm25_score, FtsAttachmentIndex};

use std::collections::HashMap;

use serde::Serialize;

use crate::records::RecordId;

/// An attachment hit for a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentRef {
    pub attachment_id: String,
    pub file_name: String,
    /// Relevance in 0..1, higher is better
    pub score: f32,
    pub snippet: Option<String>,
}

/// Source of attachment hits. Ids with no hits may be absent from the result.
pub trait AttachmentSource {
    fn fetch_attachments(&self, ids: &[RecordId], limit: usize) -> HashMap<RecordId, Vec<AttachmentRef>>;
}

/// Enrichment turned off.
pub struct NoAttachments;

impl AttachmentSource for NoAttachments {
    fn fetch_attachments(&self, _ids: &[RecordId], _limit: usize) -> HashMap<RecordId, Vec<AttachmentRef>> {
        HashMap::new()
    }
}
