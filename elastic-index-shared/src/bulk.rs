//! Bulk operation model.
//!
//! A bulk request is a sequence of per-document actions. Each action renders
//! to one or two NDJSON lines (action metadata, then the body when the action
//! carries one). Outcomes are collected into a [`BulkResult`] instead of being
//! raised, so a single rejected document never hides the rest of the batch.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::Document;

/// Bulk action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOpType {
    /// Write the whole document, replacing any existing one.
    #[default]
    Index,
    /// Merge the document into the existing one.
    Update,
    /// Remove the document.
    Delete,
}

impl BulkOpType {
    /// The action name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOpType::Index => "index",
            BulkOpType::Update => "update",
            BulkOpType::Delete => "delete",
        }
    }

    /// Whether the action can only address an existing identifier.
    pub fn requires_identifier(&self) -> bool {
        !matches!(self, BulkOpType::Index)
    }
}

impl fmt::Display for BulkOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    /// The action to perform.
    pub op_type: BulkOpType,
    /// Target identifier. `None` lets the engine assign one (index only).
    pub id: Option<String>,
    /// Full document for index, partial document for update, `None` for delete.
    pub payload: Option<Document>,
    /// For updates: create the document from the payload when it is absent.
    pub upsert: bool,
}

impl BulkOperation {
    /// Create an index action.
    pub fn index(id: Option<String>, document: Document) -> Self {
        Self {
            op_type: BulkOpType::Index,
            id,
            payload: Some(document),
            upsert: false,
        }
    }

    /// Create a partial update action.
    pub fn update(id: Option<String>, partial: Document, upsert: bool) -> Self {
        Self {
            op_type: BulkOpType::Update,
            id,
            payload: Some(partial),
            upsert,
        }
    }

    /// Create a delete action.
    pub fn delete(id: Option<String>) -> Self {
        Self {
            op_type: BulkOpType::Delete,
            id,
            payload: None,
            upsert: false,
        }
    }

    /// Whether the engine can address this action as built.
    pub fn is_addressable(&self) -> bool {
        !self.op_type.requires_identifier() || self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Render the action as bulk request lines.
    ///
    /// The index name is carried by the request path, so only `_id` appears in
    /// the action metadata, and only when an identifier is present.
    pub fn to_bulk_lines(&self) -> Vec<Value> {
        let mut meta = serde_json::Map::new();
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            meta.insert("_id".to_string(), json!(id));
        }
        let mut action = serde_json::Map::new();
        action.insert(self.op_type.as_str().to_string(), Value::Object(meta));
        let action = Value::Object(action);

        match (self.op_type, &self.payload) {
            (BulkOpType::Index, Some(doc)) => vec![action, Value::Object(doc.clone())],
            (BulkOpType::Index, None) => vec![action, json!({})],
            (BulkOpType::Update, payload) => {
                let doc = payload.clone().unwrap_or_default();
                let body = if self.upsert {
                    json!({ "doc": doc, "doc_as_upsert": true })
                } else {
                    json!({ "doc": doc })
                };
                vec![action, body]
            }
            (BulkOpType::Delete, _) => vec![action],
        }
    }
}

/// A single failed action of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Position of the action in the submitted input.
    pub position: usize,
    /// The action that failed.
    pub op_type: BulkOpType,
    /// The identifier the action addressed, if any.
    pub id: Option<String>,
    /// HTTP status reported for the item, when the engine reported one.
    pub status: Option<u16>,
    /// Reported cause.
    pub cause: String,
}

impl fmt::Display for BulkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} id={} status={}: {}",
            self.position,
            self.op_type,
            self.id.as_deref().unwrap_or("<auto>"),
            self.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            self.cause
        )
    }
}

/// Aggregate outcome of a bulk request.
///
/// `succeeded + failures.len() == total` holds for every result built by the
/// bulk engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Number of submitted actions.
    pub total: usize,
    /// Number of actions the engine acknowledged.
    pub succeeded: usize,
    /// Failed actions, in submission order.
    pub failures: Vec<BulkFailure>,
}

impl BulkResult {
    /// An empty result (nothing submitted).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of failed actions.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every submitted action succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Append another result, shifting its failure positions past this one.
    pub fn merge(&mut self, other: BulkResult) {
        let offset = self.total;
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures.into_iter().map(|mut failure| {
            failure.position += offset;
            failure
        }));
    }
}
