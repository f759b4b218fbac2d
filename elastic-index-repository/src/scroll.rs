//! Scroll cursor.
//!
//! A cursor walks a result set forward in batches. It holds the most recent
//! continuation token issued by the engine; each fetch presents that token
//! and replaces it with the one returned. The first empty batch ends the walk
//! and releases the server-side context.
//!
//! ```text
//! Pending --search(scroll)--> Open(token) --continue--> Open(token') ...
//!    |                            |
//!    +------ empty batch ---------+--> Exhausted (context cleared)
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ScrollOptions;
use crate::errors::SearchError;
use crate::interfaces::SearchTransport;
use crate::opensearch::queries::hits_to_documents;
use crate::types::SearchPage;
use elastic_index_shared::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScrollState {
    /// No request issued yet.
    Pending,
    /// The engine holds a context addressed by this token.
    Open(String),
    /// Drained or closed; no context is held.
    Exhausted,
}

/// Forward-only, single-pass cursor over a scrolled search.
///
/// Drain it with [`ScrollCursor::next_batch`] until it returns `None`, or call
/// [`ScrollCursor::close`] to abandon it early. A cursor dropped while open
/// leaves its context on the engine until the keep-alive expires.
pub struct ScrollCursor {
    transport: Arc<dyn SearchTransport>,
    index: String,
    category: String,
    query: Value,
    options: ScrollOptions,
    state: ScrollState,
    batches: usize,
}

impl ScrollCursor {
    pub(crate) fn new(
        transport: Arc<dyn SearchTransport>,
        index: String,
        category: String,
        query: Value,
        options: ScrollOptions,
    ) -> Self {
        Self {
            transport,
            index,
            category,
            query,
            options,
            state: ScrollState::Pending,
            batches: 0,
        }
    }

    /// Fetch the next batch.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(batch))` - Up to `size` documents (or raw hits)
    /// * `Ok(None)` - The result set is exhausted
    /// * `Err(SearchError)` - The fetch failed; the cursor keeps its token and may be closed
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Document>>, SearchError> {
        if self.options.size == 0 {
            return Err(SearchError::invalid_argument("scroll batch size must be at least 1"));
        }

        let page = match &self.state {
            ScrollState::Exhausted => return Ok(None),
            ScrollState::Pending => {
                self.transport
                    .search(
                        &self.index,
                        &self.category,
                        &self.query,
                        self.options.size,
                        Some(self.options.keep_alive.as_str()),
                    )
                    .await?
            }
            ScrollState::Open(token) => {
                self.transport
                    .continue_scroll(token, &self.options.keep_alive)
                    .await?
            }
        };

        self.advance(page).await
    }

    /// Apply a fetched page to the state machine.
    async fn advance(&mut self, page: SearchPage) -> Result<Option<Vec<Document>>, SearchError> {
        if page.is_empty() {
            let token = page.scroll_id.or_else(|| match &self.state {
                ScrollState::Open(token) => Some(token.clone()),
                _ => None,
            });
            self.state = ScrollState::Exhausted;
            if let Some(token) = token {
                self.release(&token).await;
            }
            debug!(index = %self.index, batches = self.batches, "Scroll exhausted");
            return Ok(None);
        }

        let SearchPage { hits, scroll_id } = page;
        let token = scroll_id.ok_or_else(|| SearchError::parse("scroll response has no _scroll_id"))?;
        self.state = ScrollState::Open(token);
        self.batches += 1;

        debug!(
            index = %self.index,
            batch = self.batches,
            hits = hits.len(),
            "Fetched scroll batch"
        );
        Ok(Some(hits_to_documents(hits, self.options.unpack)))
    }

    /// Clear a context once the cursor no longer needs it.
    ///
    /// The context expires on its own, so a failed release is only logged.
    async fn release(&self, token: &str) {
        if let Err(e) = self.transport.clear_scroll(token).await {
            warn!(index = %self.index, error = %e, "Failed to clear scroll context");
        }
    }

    /// Collect every remaining batch into one vector.
    ///
    /// The whole result set is held in memory.
    pub async fn drain(&mut self) -> Result<Vec<Document>, SearchError> {
        let mut documents = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            documents.extend(batch);
        }
        Ok(documents)
    }

    /// Abandon the cursor, releasing the server-side context right away.
    pub async fn close(&mut self) -> Result<(), SearchError> {
        let state = std::mem::replace(&mut self.state, ScrollState::Exhausted);
        if let ScrollState::Open(token) = state {
            self.transport.clear_scroll(&token).await?;
            debug!(index = %self.index, batches = self.batches, "Scroll closed");
        }
        Ok(())
    }

    /// Whether the cursor has finished (drained or closed).
    pub fn is_exhausted(&self) -> bool {
        self.state == ScrollState::Exhausted
    }

    /// Number of non-empty batches fetched so far.
    pub fn batches_fetched(&self) -> usize {
        self.batches
    }

    /// The continuation token the next fetch will present.
    pub fn scroll_id(&self) -> Option<&str> {
        match &self.state {
            ScrollState::Open(token) => Some(token),
            _ => None,
        }
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        if let ScrollState::Open(_) = self.state {
            warn!(
                index = %self.index,
                keep_alive = %self.options.keep_alive,
                "Scroll cursor dropped while open; the context is held until its keep-alive expires"
            );
        }
    }
}
