//! Request and response types exchanged with the search transport.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handle::IndexHandle;
use elastic_index_shared::{BulkOpType, BulkResult};

/// One page of search or scroll results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Raw hits, each carrying `_id`, `_source` and the other metadata fields.
    pub hits: Vec<Value>,
    /// Continuation token, present when the request opened or continued a scroll.
    pub scroll_id: Option<String>,
}

impl SearchPage {
    /// Whether the page carries no hits (the scroll termination condition).
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Outcome of a single document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The engine stored the document under the given identifier.
    Accepted { id: String },
    /// The engine refused the document (mapping or validation conflict).
    Rejected { reason: String },
}

/// Per-item status reported by the engine for a bulk request.
///
/// Items are reported in the order the actions were submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemStatus {
    /// The action the item answers.
    pub op_type: BulkOpType,
    /// Identifier of the affected document (assigned by the engine for auto ids).
    pub id: Option<String>,
    /// HTTP status of the item.
    pub status: u16,
    /// `type: reason` of the reported error, if the item failed.
    pub error: Option<String>,
}

impl BulkItemStatus {
    /// Whether the item succeeded.
    ///
    /// A delete of a missing document is reported as 404 without an error
    /// object; the document is absent either way, so it counts as a success.
    pub fn is_success(&self) -> bool {
        if self.error.is_some() {
            return false;
        }
        (200..300).contains(&self.status)
            || (self.op_type == BulkOpType::Delete && self.status == 404)
    }
}

/// Outcome of copying one index into another.
#[derive(Debug)]
pub struct ReindexReport {
    /// Handle to the target index.
    pub target: IndexHandle,
    /// Aggregated bulk outcome across every batch.
    pub result: BulkResult,
    /// Number of scroll batches copied.
    pub batches: usize,
}

/// Outcome of exporting an index to a file.
#[derive(Debug, Clone, Serialize)]
pub struct DumpSummary {
    /// The file written.
    pub path: PathBuf,
    /// Number of documents written.
    pub documents: usize,
    /// When the file was written.
    pub written_at: DateTime<Utc>,
}
