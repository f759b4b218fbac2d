//! OpenSearch transport implementation.
//!
//! This module provides the concrete implementation of `SearchTransport`
//! using the OpenSearch Rust client. Each trait call maps to exactly one
//! request; status codes are translated into the outcomes the index handle
//! expects (missing documents, rejected writes, per-item bulk statuses).

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, ClearScrollParts, CountParts, GetParts, IndexParts, OpenSearch, ScrollParts,
    SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchTransport;
use crate::types::{BulkItemStatus, IndexOutcome, SearchPage};
use elastic_index_shared::{BulkOpType, BulkOperation, Document};

/// OpenSearch transport.
///
/// Mapping types no longer exist in OpenSearch, so every document lives under
/// `_doc`; the category passed by the handle is only recorded in logs.
///
/// # Example
///
/// ```ignore
/// let transport = OpenSearchTransport::new("http://localhost:9200", Duration::from_secs(300))?;
/// let exists = transport.index_exists("test").await?;
/// ```
pub struct OpenSearchTransport {
    client: OpenSearch,
    endpoint: String,
}

impl OpenSearchTransport {
    /// Create a new transport connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `timeout` - Upper bound for every request issued through this transport
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchTransport)` - A new transport instance
    /// * `Err(SearchError::ConnectionError)` - If the URL is invalid or the transport cannot be built
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            timeout_secs = timeout.as_secs(),
            "Created OpenSearch transport"
        );

        Ok(Self {
            client,
            endpoint: url.to_string(),
        })
    }

    /// Read a response body as JSON.
    async fn read_json(response: Response) -> Result<Value, SearchError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    /// Read a failed response body and describe its error.
    async fn read_failure(response: Response) -> String {
        let body = response.text().await.unwrap_or_default();
        describe_failure(&body)
    }

    /// Parse a search or scroll response into a page.
    fn parse_page(body: Value) -> Result<SearchPage, SearchError> {
        let hits = body
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(|h| h.as_array())
            .cloned()
            .ok_or_else(|| SearchError::parse("search response has no hits array"))?;

        let scroll_id = body
            .get("_scroll_id")
            .and_then(|s| s.as_str())
            .map(str::to_string);

        Ok(SearchPage { hits, scroll_id })
    }
}

/// Interpret the status of an index existence check.
///
/// Anything but 200 or 404 means the node could not answer the check, which
/// surfaces as a connection failure.
fn index_exists_from_status(status: u16) -> Result<bool, SearchError> {
    match status {
        200 => Ok(true),
        404 => Ok(false),
        status => Err(SearchError::connection(format!(
            "Index existence check failed with status {}",
            status
        ))),
    }
}

/// Describe an error response body as `type: reason`, falling back to the raw text.
fn describe_failure(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").map(describe_error))
        .unwrap_or_else(|| body.to_string())
}

/// Describe an `error` object as `type: reason`.
fn describe_error(error: &Value) -> String {
    match error {
        Value::Object(_) => {
            let kind = error.get("type").and_then(|t| t.as_str()).unwrap_or("error");
            match error.get("reason").and_then(|r| r.as_str()) {
                Some(reason) => format!("{}: {}", kind, reason),
                None => kind.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse the `items` of a bulk response.
fn parse_bulk_items(body: &Value) -> Result<Vec<BulkItemStatus>, SearchError> {
    let items = body
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| SearchError::parse("bulk response has no items array"))?;

    items
        .iter()
        .map(|item| {
            let (action, status) = item
                .as_object()
                .and_then(|obj| obj.iter().next())
                .ok_or_else(|| SearchError::parse(format!("malformed bulk item: {}", item)))?;

            let op_type = match action.as_str() {
                "index" | "create" => BulkOpType::Index,
                "update" => BulkOpType::Update,
                "delete" => BulkOpType::Delete,
                other => {
                    return Err(SearchError::parse(format!("unknown bulk action: {}", other)));
                }
            };

            Ok(BulkItemStatus {
                op_type,
                id: status.get("_id").and_then(|i| i.as_str()).map(str::to_string),
                status: status
                    .get("status")
                    .and_then(|s| s.as_u64())
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(0),
                error: status.get("error").map(describe_error),
            })
        })
        .collect()
}

#[async_trait]
impl SearchTransport for OpenSearchTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        index_exists_from_status(response.status_code().as_u16())
    }

    #[instrument(skip(self, body))]
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Index creation failed");
            return Err(SearchError::schema(format!(
                "Creating index {} failed with status {}: {}",
                index, status, cause
            )));
        }

        info!(index = %index, "Index created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the index may not exist
        if status.as_u16() == 404 {
            debug!(index = %index, "Index to delete does not exist");
            return Ok(false);
        }
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Index deletion failed");
            return Err(SearchError::schema(format!(
                "Deleting index {} failed with status {}: {}",
                index, status, cause
            )));
        }

        info!(index = %index, "Index deleted");
        Ok(true)
    }

    async fn refresh(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            return Err(SearchError::query(format!(
                "Refresh failed with status {}: {}",
                status, cause
            )));
        }
        Ok(())
    }

    async fn get_document(
        &self,
        index: &str,
        category: &str,
        id: &str,
    ) -> Result<Option<Value>, SearchError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            debug!(index = %index, category = %category, id = %id, "Document not found");
            return Ok(None);
        }
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Get request failed");
            return Err(SearchError::query(format!(
                "Get failed with status {}: {}",
                status, cause
            )));
        }

        Self::read_json(response).await.map(Some)
    }

    async fn index_document(
        &self,
        index: &str,
        category: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<IndexOutcome, SearchError> {
        let parts = match id {
            Some(id) => IndexParts::IndexId(index, id),
            None => IndexParts::Index(index),
        };

        let response = self
            .client
            .index(parts)
            .body(document)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();

        // 400 means the engine parsed the request and refused the document
        if status.as_u16() == 400 {
            let reason = Self::read_failure(response).await;
            debug!(index = %index, category = %category, reason = %reason, "Document rejected");
            return Ok(IndexOutcome::Rejected { reason });
        }
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Index request failed");
            return Err(SearchError::index(format!(
                "Index failed with status {}: {}",
                status, cause
            )));
        }

        let body = Self::read_json(response).await?;
        let id = body
            .get("_id")
            .and_then(|i| i.as_str())
            .map(str::to_string)
            .ok_or_else(|| SearchError::parse("index response has no _id"))?;

        debug!(index = %index, category = %category, id = %id, "Document indexed");
        Ok(IndexOutcome::Accepted { id })
    }

    async fn update_document(
        &self,
        index: &str,
        category: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), SearchError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Update request failed");
            return Err(SearchError::update(format!(
                "Update failed with status {}: {}",
                status, cause
            )));
        }

        debug!(index = %index, category = %category, id = %id, "Document updated");
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        category: &str,
        body: &Value,
        size: usize,
        scroll: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let indices = [index];
        let request = self
            .client
            .search(SearchParts::Index(&indices))
            .body(body)
            .size(size as i64);
        let request = match scroll {
            Some(keep_alive) => request.scroll(keep_alive),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Search request failed");
            return Err(SearchError::query(format!(
                "Search failed with status {}: {}",
                status, cause
            )));
        }

        let page = Self::parse_page(Self::read_json(response).await?)?;
        debug!(index = %index, category = %category, hits = page.hits.len(), "Search completed");
        Ok(page)
    }

    async fn continue_scroll(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<SearchPage, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive,
                "scroll_id": scroll_id
            }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Scroll request failed");
            return Err(SearchError::query(format!(
                "Scroll failed with status {}: {}",
                status, cause
            )));
        }

        Self::parse_page(Self::read_json(response).await?)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 means the context already expired
        if !status.is_success() && status.as_u16() != 404 {
            let cause = Self::read_failure(response).await;
            return Err(SearchError::query(format!(
                "Clearing scroll failed with status {}: {}",
                status, cause
            )));
        }
        Ok(())
    }

    async fn count(&self, index: &str, body: &Value) -> Result<u64, SearchError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            return Err(SearchError::query(format!(
                "Count failed with status {}: {}",
                status, cause
            )));
        }

        Self::read_json(response)
            .await?
            .get("count")
            .and_then(|c| c.as_u64())
            .ok_or_else(|| SearchError::parse("count response has no count"))
    }

    #[instrument(skip(self, operations), fields(operation_count = operations.len()))]
    async fn bulk(
        &self,
        index: &str,
        category: &str,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemStatus>, SearchError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for operation in operations {
            body.extend(operation.to_bulk_lines().into_iter().map(JsonBody::from));
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let cause = Self::read_failure(response).await;
            error!(status = %status, cause = %cause, "Bulk request failed");
            return Err(SearchError::bulk(format!(
                "Bulk failed with status {}: {}",
                status, cause
            )));
        }

        let items = parse_bulk_items(&Self::read_json(response).await?)?;
        debug!(index = %index, category = %category, items = items.len(), "Bulk request completed");
        Ok(items)
    }
}
