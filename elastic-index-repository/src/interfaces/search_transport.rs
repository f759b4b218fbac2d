//! Search transport trait definition.
//!
//! This module defines the narrow interface the index handle needs from a
//! search engine client. Everything above it (existence guarantee, scroll
//! state machine, bulk accounting, reindex) is backend independent.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkItemStatus, IndexOutcome, SearchPage};
use elastic_index_shared::{BulkOperation, Document};

/// Abstract interface for the remote search engine.
///
/// Implementations translate each call into one remote request. They must not
/// retry on their own; a failed request surfaces as an error to the caller.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so that a transport can be shared
/// between handles through an `Arc`.
///
/// # Error Handling
///
/// Transport-level failures are reported as `SearchError::ConnectionError`.
/// Expected outcomes (missing document, rejected write, failed bulk items) are
/// returned as values.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// The endpoint this transport talks to.
    fn endpoint(&self) -> &str;

    /// Check whether an index (or a pattern matching indices) exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index with the given body (`settings` and optional `mappings`).
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(SearchError::SchemaError)` - If the engine rejected the creation
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError>;

    /// Delete an index.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index was deleted
    /// * `Ok(false)` - If there was no such index
    /// * `Err(SearchError)` - If the deletion failed
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError>;

    /// Make recent writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), SearchError>;

    /// Fetch a document record by identifier.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The raw record including `_source`
    /// * `Ok(None)` - If the engine reported the document as not found
    async fn get_document(
        &self,
        index: &str,
        category: &str,
        id: &str,
    ) -> Result<Option<Value>, SearchError>;

    /// Write a document, replacing any document with the same identifier.
    ///
    /// A `None` identifier lets the engine assign one.
    async fn index_document(
        &self,
        index: &str,
        category: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<IndexOutcome, SearchError>;

    /// Apply an update body (`doc` or `script`) to an existing document.
    async fn update_document(
        &self,
        index: &str,
        category: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), SearchError>;

    /// Run a search. When `scroll` is set, the engine opens a scroll context
    /// kept alive for that duration and returns its token.
    async fn search(
        &self,
        index: &str,
        category: &str,
        body: &Value,
        size: usize,
        scroll: Option<&str>,
    ) -> Result<SearchPage, SearchError>;

    /// Fetch the next page of an open scroll.
    async fn continue_scroll(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<SearchPage, SearchError>;

    /// Release a scroll context before its keep-alive expires.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Count documents matching a query body.
    async fn count(&self, index: &str, body: &Value) -> Result<u64, SearchError>;

    /// Submit a bulk request.
    ///
    /// Never fails because of individual items: one status per submitted
    /// operation is returned, in submission order. An error means the request
    /// as a whole was not processed.
    async fn bulk(
        &self,
        index: &str,
        category: &str,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemStatus>, SearchError>;
}
