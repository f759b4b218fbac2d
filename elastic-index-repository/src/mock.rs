//! In-memory search transport for tests.
//!
//! Emulates the engine behaviour the handle relies on: index existence,
//! mapping-type rejection, scroll contexts whose token is retired on every
//! fetch, and per-item bulk statuses.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::SearchTransport;
use crate::types::{BulkItemStatus, IndexOutcome, SearchPage};
use elastic_index_shared::{BulkOpType, BulkOperation, Document};

#[derive(Default)]
struct MockIndex {
    mapping: Option<Value>,
    docs: BTreeMap<String, Document>,
}

struct ScrollContext {
    remaining: VecDeque<Value>,
    size: usize,
}

#[derive(Default)]
struct MockState {
    indices: HashMap<String, MockIndex>,
    scrolls: HashMap<String, ScrollContext>,
    created: Vec<(String, Value)>,
    deleted: Vec<String>,
    cleared_scrolls: Vec<String>,
    update_bodies: Vec<Value>,
    bulk_requests: usize,
    next_auto_id: u64,
    fail_bulk: bool,
    fail_scroll: bool,
    unreachable: bool,
}

/// Mock transport backed by in-memory indices.
pub(crate) struct MockTransport {
    endpoint: String,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::with_endpoint("http://mock:9200")
    }

    pub(crate) fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            state: Mutex::new(MockState::default()),
        }
    }

    pub(crate) async fn set_fail_bulk(&self, fail: bool) {
        self.state.lock().await.fail_bulk = fail;
    }

    pub(crate) async fn set_fail_scroll(&self, fail: bool) {
        self.state.lock().await.fail_scroll = fail;
    }

    pub(crate) async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    pub(crate) async fn document_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.docs.len())
            .unwrap_or(0)
    }

    pub(crate) async fn stored(&self, index: &str, id: &str) -> Option<Document> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .and_then(|i| i.docs.get(id).cloned())
    }

    pub(crate) async fn mapping(&self, index: &str) -> Option<Value> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .and_then(|i| i.mapping.clone())
    }

    pub(crate) async fn created(&self) -> Vec<(String, Value)> {
        self.state.lock().await.created.clone()
    }

    pub(crate) async fn deleted(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    pub(crate) async fn open_scrolls(&self) -> usize {
        self.state.lock().await.scrolls.len()
    }

    pub(crate) async fn cleared_scrolls(&self) -> Vec<String> {
        self.state.lock().await.cleared_scrolls.clone()
    }

    pub(crate) async fn update_bodies(&self) -> Vec<Value> {
        self.state.lock().await.update_bodies.clone()
    }

    pub(crate) async fn bulk_requests(&self) -> usize {
        self.state.lock().await.bulk_requests
    }

    pub(crate) async fn insert(&self, index: &str, id: &str, document: Value) {
        let mut state = self.state.lock().await;
        let target = state.indices.entry(index.to_string()).or_default();
        if let Value::Object(doc) = document {
            target.docs.insert(id.to_string(), doc);
        }
    }
}

impl MockState {
    fn check_reachable(&self) -> Result<(), SearchError> {
        if self.unreachable {
            return Err(SearchError::connection("connection refused"));
        }
        Ok(())
    }

    fn auto_id(&mut self) -> String {
        self.next_auto_id += 1;
        format!("auto-{}", self.next_auto_id)
    }

    fn store(
        &mut self,
        index: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<String, String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.auto_id(),
        };
        let target = self.indices.entry(index.to_string()).or_default();
        if let Some(reason) = validate(target.mapping.as_ref(), document) {
            return Err(reason);
        }
        target.docs.insert(id.clone(), document.clone());
        Ok(id)
    }

    fn matching_hits(&self, index: &str, body: &Value) -> Result<Vec<Value>, SearchError> {
        let target = self.indices.get(index).ok_or_else(|| {
            SearchError::query(format!("index_not_found_exception: no such index [{}]", index))
        })?;

        Ok(target
            .docs
            .iter()
            .filter(|(_, doc)| matches_query(body, doc))
            .map(|(id, doc)| {
                json!({
                    "_index": index,
                    "_id": id,
                    "_score": 1.0,
                    "_source": doc
                })
            })
            .collect())
    }

    fn open_scroll(&mut self, mut remaining: VecDeque<Value>, size: usize) -> SearchPage {
        let take = size.min(remaining.len());
        let hits: Vec<Value> = remaining.drain(..take).collect();
        let token = Uuid::new_v4().to_string();
        self.scrolls
            .insert(token.clone(), ScrollContext { remaining, size });
        SearchPage {
            hits,
            scroll_id: Some(token),
        }
    }
}

/// Supports `match_all` and single-field `term` queries.
fn matches_query(body: &Value, doc: &Document) -> bool {
    match body.get("query").and_then(|q| q.get("term")).and_then(|t| t.as_object()) {
        Some(term) => term.iter().all(|(field, expected)| {
            let expected = expected.get("value").unwrap_or(expected);
            doc.get(field) == Some(expected)
        }),
        None => true,
    }
}

/// Returns the rejection reason when a document conflicts with the mapping.
fn validate(mapping: Option<&Value>, document: &Document) -> Option<String> {
    let properties = mapping?.get("properties")?.as_object()?;
    for (field, value) in document {
        let Some(kind) = properties
            .get(field)
            .and_then(|p| p.get("type"))
            .and_then(|t| t.as_str())
        else {
            continue;
        };
        let conflict = match kind {
            "text" | "keyword" => value.is_object(),
            "boolean" => !value.is_boolean(),
            "long" | "integer" => !value.is_i64(),
            _ => false,
        };
        if conflict {
            return Some(format!(
                "mapper_parsing_exception: failed to parse field [{}] of type [{}]",
                field, kind
            ));
        }
    }
    None
}

fn merge(target: &mut Document, partial: &Document) {
    for (key, value) in partial {
        target.insert(key.clone(), value.clone());
    }
}

#[async_trait]
impl SearchTransport for MockTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        if state.indices.contains_key(index) {
            return Err(SearchError::schema(format!(
                "resource_already_exists_exception: index [{}] already exists",
                index
            )));
        }
        let mapping = body.get("mappings").cloned();
        if mapping.as_ref().is_some_and(|m| !m.is_object()) {
            return Err(SearchError::schema("mapper_parsing_exception: mapping must be an object"));
        }
        state.created.push((index.to_string(), body.clone()));
        state.indices.insert(
            index.to_string(),
            MockIndex {
                mapping,
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool, SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.deleted.push(index.to_string());
        Ok(state.indices.remove(index).is_some())
    }

    async fn refresh(&self, index: &str) -> Result<(), SearchError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        if !state.indices.contains_key(index) {
            return Err(SearchError::query(format!("index_not_found_exception: [{}]", index)));
        }
        Ok(())
    }

    async fn get_document(
        &self,
        index: &str,
        _category: &str,
        id: &str,
    ) -> Result<Option<Value>, SearchError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state
            .indices
            .get(index)
            .and_then(|i| i.docs.get(id))
            .map(|doc| {
                json!({
                    "_index": index,
                    "_id": id,
                    "found": true,
                    "_source": doc
                })
            }))
    }

    async fn index_document(
        &self,
        index: &str,
        _category: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<IndexOutcome, SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        Ok(match state.store(index, id, document) {
            Ok(id) => IndexOutcome::Accepted { id },
            Err(reason) => IndexOutcome::Rejected { reason },
        })
    }

    async fn update_document(
        &self,
        index: &str,
        _category: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.update_bodies.push(body.clone());
        let doc = state
            .indices
            .get_mut(index)
            .and_then(|i| i.docs.get_mut(id))
            .ok_or_else(|| {
                SearchError::update(format!("document_missing_exception: [{}]: document missing", id))
            })?;
        if let Some(Value::Object(partial)) = body.get("doc") {
            merge(doc, partial);
        }
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        _category: &str,
        body: &Value,
        size: usize,
        scroll: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        let hits = state.matching_hits(index, body)?;
        match scroll {
            Some(_) => Ok(state.open_scroll(hits.into(), size)),
            None => Ok(SearchPage {
                hits: hits.into_iter().take(size).collect(),
                scroll_id: None,
            }),
        }
    }

    async fn continue_scroll(
        &self,
        scroll_id: &str,
        _keep_alive: &str,
    ) -> Result<SearchPage, SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        if state.fail_scroll {
            return Err(SearchError::connection("scroll request timed out"));
        }
        let context = state.scrolls.remove(scroll_id).ok_or_else(|| {
            SearchError::query(format!(
                "search_context_missing_exception: No search context found for id [{}]",
                scroll_id
            ))
        })?;
        Ok(state.open_scroll(context.remaining, context.size))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.scrolls.remove(scroll_id);
        state.cleared_scrolls.push(scroll_id.to_string());
        Ok(())
    }

    async fn count(&self, index: &str, body: &Value) -> Result<u64, SearchError> {
        let state = self.state.lock().await;
        state.check_reachable()?;
        Ok(state.matching_hits(index, body)?.len() as u64)
    }

    async fn bulk(
        &self,
        index: &str,
        _category: &str,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemStatus>, SearchError> {
        let mut state = self.state.lock().await;
        state.check_reachable()?;
        state.bulk_requests += 1;
        if state.fail_bulk {
            return Err(SearchError::bulk("Bulk failed with status 503: unavailable"));
        }

        let mut items = Vec::with_capacity(operations.len());
        for op in operations {
            let id = op.id.as_deref();
            let item = match op.op_type {
                BulkOpType::Index => {
                    let payload = op.payload.clone().unwrap_or_default();
                    match state.store(index, id, &payload) {
                        Ok(id) => BulkItemStatus {
                            op_type: op.op_type,
                            id: Some(id),
                            status: 201,
                            error: None,
                        },
                        Err(reason) => BulkItemStatus {
                            op_type: op.op_type,
                            id: id.map(str::to_string),
                            status: 400,
                            error: Some(reason),
                        },
                    }
                }
                BulkOpType::Update => {
                    let id = id.unwrap_or_default().to_string();
                    let partial = op.payload.clone().unwrap_or_default();
                    let target = state.indices.entry(index.to_string()).or_default();
                    match target.docs.get_mut(&id) {
                        Some(doc) => {
                            merge(doc, &partial);
                            BulkItemStatus {
                                op_type: op.op_type,
                                id: Some(id),
                                status: 200,
                                error: None,
                            }
                        }
                        None if op.upsert => {
                            target.docs.insert(id.clone(), partial);
                            BulkItemStatus {
                                op_type: op.op_type,
                                id: Some(id),
                                status: 201,
                                error: None,
                            }
                        }
                        None => BulkItemStatus {
                            op_type: op.op_type,
                            error: Some(format!(
                                "document_missing_exception: [{}]: document missing",
                                id
                            )),
                            id: Some(id),
                            status: 404,
                        },
                    }
                }
                BulkOpType::Delete => {
                    let id = id.unwrap_or_default().to_string();
                    let removed = state
                        .indices
                        .get_mut(index)
                        .and_then(|i| i.docs.remove(&id))
                        .is_some();
                    BulkItemStatus {
                        op_type: op.op_type,
                        id: Some(id),
                        status: if removed { 200 } else { 404 },
                        error: None,
                    }
                }
            };
            items.push(item);
        }
        Ok(items)
    }
}
