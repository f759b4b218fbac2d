//! Query bodies and hit handling.

use serde_json::{json, Value};

use elastic_index_shared::Document;

/// Largest number of hits a single search may return.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Build the query matching every document.
pub fn match_all() -> Value {
    json!({
        "query": {
            "match_all": {}
        }
    })
}

/// Use the caller's query, or match everything.
pub fn query_or_match_all(query: Option<&Value>) -> Value {
    query.cloned().unwrap_or_else(match_all)
}

/// Reduce a count request body to the parts the count API accepts.
///
/// Search bodies may carry `sort`, `size`, `_source` and similar keys that the
/// count endpoint rejects; only `query` is kept.
pub fn count_body(query: Option<&Value>) -> Value {
    let query = query_or_match_all(query);
    match query.get("query") {
        Some(inner) => json!({ "query": inner }),
        None => match_all(),
    }
}

/// Turn a hit into a document.
///
/// With `unpack`, a hit carrying `_source` yields that source; any other hit
/// (e.g. one fetched with `_source: false`) is returned whole.
pub fn hit_to_document(hit: Value, unpack: bool) -> Document {
    let mut hit = match hit {
        Value::Object(map) => map,
        other => {
            let mut wrapped = Document::new();
            wrapped.insert("_value".to_string(), other);
            return wrapped;
        }
    };

    if !unpack {
        return hit;
    }

    match hit.remove("_source") {
        Some(Value::Object(source)) => source,
        Some(other) => {
            hit.insert("_source".to_string(), other);
            hit
        }
        None => hit,
    }
}

/// Turn a page of hits into documents.
pub fn hits_to_documents(hits: Vec<Value>, unpack: bool) -> Vec<Document> {
    hits.into_iter()
        .map(|hit| hit_to_document(hit, unpack))
        .collect()
}

/// Build a partial update body.
pub fn doc_update_body(partial: &Document) -> Value {
    json!({ "doc": partial })
}

/// Build a scripted update body. `params` are attached only when given.
pub fn script_update_body(source: &str, params: Option<&Document>) -> Value {
    let mut script = serde_json::Map::new();
    script.insert("source".to_string(), json!(source));
    script.insert("lang".to_string(), json!("painless"));
    if let Some(params) = params {
        script.insert("params".to_string(), Value::Object(params.clone()));
    }
    json!({ "script": script })
}
