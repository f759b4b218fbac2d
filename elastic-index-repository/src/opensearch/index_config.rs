//! Index creation bodies.
//!
//! This module builds the body sent when an index is created: the caller's
//! mapping and settings, or the default settings when none are given.

use serde_json::{json, Map, Value};

/// Default number of primary shards.
pub const DEFAULT_SHARDS: u32 = 5;

/// Default number of replicas.
pub const DEFAULT_REPLICAS: u32 = 1;

/// Get the settings applied to an index created without explicit settings.
///
/// - 5 primary shards, 1 replica
/// - replicas expand automatically between 0 and 1, so a single node stays green
/// - refreshed every second
pub fn default_settings() -> Value {
    json!({
        "number_of_shards": DEFAULT_SHARDS,
        "number_of_replicas": DEFAULT_REPLICAS,
        "auto_expand_replicas": "0-1",
        "refresh_interval": "1s"
    })
}

/// Build the index creation body.
///
/// The mapping is included only when given; settings fall back to
/// [`default_settings`].
pub fn create_index_body(mapping: Option<&Value>, settings: Option<&Value>) -> Value {
    let mut body = Map::new();
    if let Some(mapping) = mapping {
        body.insert("mappings".to_string(), mapping.clone());
    }
    body.insert(
        "settings".to_string(),
        settings.cloned().unwrap_or_else(default_settings),
    );
    Value::Object(body)
}
