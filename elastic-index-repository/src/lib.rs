//! # Elastic Index Repository
//!
//! A convenience layer over a search engine's HTTP API that manages one
//! logical index. It provides point reads and writes, bounded search,
//! scroll cursors, bulk requests with per-item failure accounting, and
//! reindex/dump pipelines composed from those.
//!
//! The remote calls go through the [`SearchTransport`] trait;
//! [`OpenSearchTransport`] is the concrete implementation.

mod bulk;
pub mod config;
pub mod errors;
pub mod handle;
pub mod interfaces;
#[cfg(test)]
mod mock;
pub mod opensearch;
mod reindex;
pub mod scroll;
pub mod types;

pub use config::{BulkOptions, DumpOptions, IndexOptions, ReindexOptions, ScrollOptions};
pub use errors::SearchError;
pub use handle::IndexHandle;
pub use interfaces::SearchTransport;
pub use opensearch::OpenSearchTransport;
pub use scroll::ScrollCursor;
pub use types::{BulkItemStatus, DumpSummary, IndexOutcome, ReindexReport, SearchPage};

pub use elastic_index_shared::{BulkFailure, BulkOpType, BulkOperation, BulkResult, Document};
