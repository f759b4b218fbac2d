//! Index handle implementation.
//!
//! An `IndexHandle` targets one remote index (or a wildcard pattern) and is the
//! entry point for every operation: point reads and writes, bounded search,
//! scroll cursors, bulk requests, reindex and dump. Opening a handle guarantees
//! that the index exists remotely.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{IndexOptions, ScrollOptions};
use crate::errors::SearchError;
use crate::interfaces::SearchTransport;
use crate::opensearch::queries::{
    count_body, doc_update_body, hit_to_document, hits_to_documents, query_or_match_all,
    script_update_body, MAX_RESULT_WINDOW,
};
use crate::opensearch::{create_index_body, OpenSearchTransport};
use crate::scroll::ScrollCursor;
use crate::types::IndexOutcome;
use elastic_index_shared::Document;

/// Scroll batch size used by [`IndexHandle::scan_all`].
const SCAN_BATCH_SIZE: usize = 1000;

/// Handle to a single remote index.
///
/// # Example
///
/// ```ignore
/// let handle = IndexHandle::open("test", "document", IndexOptions::default()).await?;
///
/// let mut doc = Document::new();
/// doc.insert("test".to_string(), json!(true));
/// handle.index_into(&doc, "1").await?;
///
/// let stored = handle.get("1").await?;
/// ```
pub struct IndexHandle {
    pub(crate) transport: Arc<dyn SearchTransport>,
    pub(crate) index: String,
    pub(crate) category: String,
    pub(crate) options: IndexOptions,
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("index", &self.index)
            .field("category", &self.category)
            .field("endpoint", &self.transport.endpoint())
            .finish()
    }
}

impl IndexHandle {
    /// Open a handle on an OpenSearch endpoint, creating the index if needed.
    ///
    /// # Arguments
    ///
    /// * `index` - Index name; wildcards target several indices at once
    /// * `category` - Document category of the stored documents
    /// * `options` - Endpoint, timeout, schema and replacement options
    ///
    /// # Returns
    ///
    /// * `Ok(IndexHandle)` - The index exists remotely
    /// * `Err(SearchError::ConnectionError)` - If the endpoint cannot be reached
    /// * `Err(SearchError::SchemaError)` - If creation or replacement was rejected
    pub async fn open(
        index: impl Into<String>,
        category: impl Into<String>,
        options: IndexOptions,
    ) -> Result<Self, SearchError> {
        let transport = OpenSearchTransport::new(&options.endpoint_url, options.timeout)?;
        Self::open_with_transport(Arc::new(transport), index, category, options).await
    }

    /// Open a handle over an existing transport.
    pub async fn open_with_transport(
        transport: Arc<dyn SearchTransport>,
        index: impl Into<String>,
        category: impl Into<String>,
        options: IndexOptions,
    ) -> Result<Self, SearchError> {
        let handle = Self {
            transport,
            index: index.into(),
            category: category.into(),
            options,
        };

        handle.ensure_index().await?;

        info!(
            index = %handle.index,
            category = %handle.category,
            endpoint = %handle.transport.endpoint(),
            "Opened index handle"
        );
        Ok(handle)
    }

    /// Drop the index first when replacement is requested, then create it if absent.
    ///
    /// An existing index is reused as-is; its mapping and settings are not
    /// compared with the requested ones.
    async fn ensure_index(&self) -> Result<(), SearchError> {
        if self.options.replace_existing {
            let deleted = self.transport.delete_index(&self.index).await?;
            debug!(index = %self.index, deleted, "Replacing existing index");
        }

        if !self.transport.index_exists(&self.index).await? {
            self.create().await?;
        }
        Ok(())
    }

    /// The index name or pattern.
    pub fn name(&self) -> &str {
        &self.index
    }

    /// The document category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The options this handle was opened with.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// The endpoint the handle talks to.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Create the index with the handle's mapping and settings.
    ///
    /// Fails with `SchemaError` if the index already exists.
    pub async fn create(&self) -> Result<(), SearchError> {
        let body = create_index_body(self.options.mapping.as_ref(), self.options.settings.as_ref());
        self.transport.create_index(&self.index, &body).await
    }

    /// Delete the index and all its documents.
    ///
    /// Returns `false` if the index did not exist.
    #[instrument(skip(self), fields(index = %self.index))]
    pub async fn delete(&self) -> Result<bool, SearchError> {
        self.transport.delete_index(&self.index).await
    }

    /// Make recent writes visible to search and scroll.
    pub async fn refresh(&self) -> Result<(), SearchError> {
        self.transport.refresh(&self.index).await
    }

    /// Count documents matching a query (all documents when `None`).
    pub async fn count(&self, query: Option<&Value>) -> Result<u64, SearchError> {
        self.transport.count(&self.index, &count_body(query)).await
    }

    /// Fetch a document by identifier.
    ///
    /// Returns `None` when the document does not exist. This is a lookup by
    /// identifier only; use [`IndexHandle::search`] to find documents.
    #[instrument(skip(self), fields(index = %self.index))]
    pub async fn get(&self, id: &str) -> Result<Option<Document>, SearchError> {
        if id.is_empty() {
            return Err(SearchError::invalid_argument("document identifier must not be empty"));
        }

        let record = self
            .transport
            .get_document(&self.index, &self.category, id)
            .await?;
        Ok(record.map(|record| hit_to_document(record, true)))
    }

    /// Write a document under the given identifier, replacing any existing one.
    ///
    /// An empty identifier lets the engine assign one.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the document was stored
    /// * `Ok(false)` - If the engine rejected it (e.g. a mapping conflict)
    /// * `Err(SearchError)` - If the request itself failed
    pub async fn index_into(&self, document: &Document, id: &str) -> Result<bool, SearchError> {
        let id = Some(id).filter(|id| !id.is_empty());
        let outcome = self
            .transport
            .index_document(&self.index, &self.category, id, document)
            .await?;

        match outcome {
            IndexOutcome::Accepted { id } => {
                debug!(index = %self.index, id = %id, "Document indexed");
                Ok(true)
            }
            IndexOutcome::Rejected { reason } => {
                warn!(index = %self.index, reason = %reason, "Document rejected");
                Ok(false)
            }
        }
    }

    /// Merge a partial document into an existing document.
    ///
    /// The document must exist; missing documents are not created.
    pub async fn update(&self, partial: &Document, id: &str) -> Result<(), SearchError> {
        self.transport
            .update_document(&self.index, &self.category, id, &doc_update_body(partial))
            .await
    }

    /// Update a document with a painless script.
    ///
    /// `params` are bound to the script only when given.
    pub async fn script_update(
        &self,
        script: &str,
        params: Option<&Document>,
        id: &str,
    ) -> Result<(), SearchError> {
        self.transport
            .update_document(
                &self.index,
                &self.category,
                id,
                &script_update_body(script, params),
            )
            .await
    }

    /// Run a single search request.
    ///
    /// At most 10 000 hits can be returned by one request; larger sizes are
    /// clamped. Use [`IndexHandle::scroll`] to walk bigger result sets.
    ///
    /// # Arguments
    ///
    /// * `query` - Query body; `None` matches all documents
    /// * `size` - Maximum number of hits
    /// * `unpack` - Reduce hits to their `_source` documents
    #[instrument(skip(self, query), fields(index = %self.index))]
    pub async fn search(
        &self,
        query: Option<&Value>,
        size: usize,
        unpack: bool,
    ) -> Result<Vec<Document>, SearchError> {
        let size = if size > MAX_RESULT_WINDOW {
            warn!(
                requested = size,
                max = MAX_RESULT_WINDOW,
                "Search size exceeds the result window; use a scroll for larger result sets"
            );
            MAX_RESULT_WINDOW
        } else {
            size
        };

        let body = query_or_match_all(query);
        let page = self
            .transport
            .search(&self.index, &self.category, &body, size, None)
            .await?;
        Ok(hits_to_documents(page.hits, unpack))
    }

    /// Retrieve every matching document.
    ///
    /// The whole result set is held in memory; prefer [`IndexHandle::scroll`]
    /// for large indices.
    #[instrument(skip(self, query), fields(index = %self.index))]
    pub async fn scan_all(&self, query: Option<&Value>) -> Result<Vec<Document>, SearchError> {
        let mut cursor = self.scroll(query, ScrollOptions::default().with_size(SCAN_BATCH_SIZE));
        let documents = cursor.drain().await?;
        info!(index = %self.index, documents = documents.len(), "Scanned index");
        Ok(documents)
    }

    /// Open a scroll cursor over a query (all documents when `None`).
    ///
    /// No request is issued until the first batch is fetched.
    pub fn scroll(&self, query: Option<&Value>, options: ScrollOptions) -> ScrollCursor {
        ScrollCursor::new(
            Arc::clone(&self.transport),
            self.index.clone(),
            self.category.clone(),
            query_or_match_all(query),
            options,
        )
    }
}
