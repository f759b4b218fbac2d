//! Configuration types for the index handle and its operations.

use std::env;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::SearchError;
use elastic_index_shared::BulkOpType;

/// Default search engine URL.
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:9200";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default scroll keep-alive.
pub const DEFAULT_KEEP_ALIVE: &str = "5m";

/// Default number of hits per search or scroll batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Scroll batch size used when copying an index.
pub const DEFAULT_REINDEX_BATCH_SIZE: usize = 500;

/// Environment variable holding the endpoint URL.
pub const ENDPOINT_URL_VAR: &str = "ELASTIC_URL";

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_SECS_VAR: &str = "ELASTIC_TIMEOUT_SECS";

/// Options used when opening an index handle.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Search engine URL.
    pub endpoint_url: String,
    /// Field mapping applied when the index is created.
    pub mapping: Option<Value>,
    /// Index settings applied when the index is created. Defaults apply when `None`.
    pub settings: Option<Value>,
    /// Timeout bounding each remote request.
    pub timeout: Duration,
    /// Delete any existing index of the same name before ensuring it exists.
    pub replace_existing: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            mapping: None,
            settings: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            replace_existing: false,
        }
    }
}

impl IndexOptions {
    /// Build options from the environment, loading a `.env` file if present.
    ///
    /// # Environment Variables
    ///
    /// - `ELASTIC_URL`: search engine URL (default: http://localhost:9200)
    /// - `ELASTIC_TIMEOUT_SECS`: request timeout in seconds (default: 300)
    pub fn from_env() -> Result<Self, SearchError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SearchError> {
        let mut options = Self::default();

        if let Some(url) = lookup(ENDPOINT_URL_VAR).filter(|url| !url.is_empty()) {
            options.endpoint_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_SECS_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|e| {
                SearchError::config(format!("{} must be a number of seconds: {}", TIMEOUT_SECS_VAR, e))
            })?;
            options.timeout = Duration::from_secs(secs);
        }

        debug!(
            endpoint_url = %options.endpoint_url,
            timeout_secs = options.timeout.as_secs(),
            "Loaded index options"
        );
        Ok(options)
    }

    /// Set the endpoint URL.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    /// Set the field mapping.
    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Set the index settings.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drop and recreate the index when the handle is opened.
    pub fn replacing_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

/// Options for a scroll cursor.
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    /// How long the engine keeps the scroll context alive between fetches.
    pub keep_alive: String,
    /// Maximum hits per batch.
    pub size: usize,
    /// Reduce hits to their `_source` documents.
    pub unpack: bool,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            size: DEFAULT_BATCH_SIZE,
            unpack: true,
        }
    }
}

impl ScrollOptions {
    /// Set the keep-alive duration (e.g. `"5m"`).
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    /// Set the batch size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Return raw hits instead of unpacked documents.
    pub fn raw(mut self) -> Self {
        self.unpack = false;
        self
    }
}

/// Options for a bulk request.
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// Document field holding the identifier. `None` or empty lets the engine assign ids.
    pub identifier_field: Option<String>,
    /// Action applied to every document.
    pub op_type: BulkOpType,
    /// For updates: create missing documents from the partial body.
    pub upsert: bool,
    /// Keep the identifier field in the payload.
    pub keep_id_field: bool,
}

impl BulkOptions {
    /// Index documents, taking identifiers from `field`.
    pub fn index_by(field: impl Into<String>) -> Self {
        Self::default().with_identifier_field(field)
    }

    /// Set the identifier field.
    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = Some(field.into());
        self
    }

    /// Set the action.
    pub fn with_op_type(mut self, op_type: BulkOpType) -> Self {
        self.op_type = op_type;
        self
    }

    /// Create missing documents on update.
    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Keep the identifier field in the payload.
    pub fn keeping_id_field(mut self, keep: bool) -> Self {
        self.keep_id_field = keep;
        self
    }

    /// The identifier field, if a non-empty one is configured.
    pub(crate) fn identifier_field(&self) -> Option<&str> {
        self.identifier_field.as_deref().filter(|field| !field.is_empty())
    }
}

/// Overrides for the target of a reindex. Unset fields are taken from the source handle.
#[derive(Debug, Clone)]
pub struct ReindexOptions {
    /// Target endpoint URL.
    pub endpoint_url: Option<String>,
    /// Target document category.
    pub category: Option<String>,
    /// Target mapping.
    pub mapping: Option<Value>,
    /// Target settings. Defaults apply when `None`; the source settings are not inherited.
    pub settings: Option<Value>,
    /// Target request timeout.
    pub timeout: Option<Duration>,
    /// Drop and recreate the target before copying.
    pub replace_existing: bool,
    /// Scroll batch size used to drain the source.
    pub batch_size: usize,
}

impl Default for ReindexOptions {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            category: None,
            mapping: None,
            settings: None,
            timeout: None,
            replace_existing: false,
            batch_size: DEFAULT_REINDEX_BATCH_SIZE,
        }
    }
}

impl ReindexOptions {
    /// Copy into an index on another endpoint.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Use another document category for the target.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Use another mapping for the target.
    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Use explicit settings for the target.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use another request timeout for the target.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Drop and recreate the target before copying.
    pub fn replacing_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    /// Set the scroll batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Options for exporting an index to a JSON file.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// File name without extension. Defaults to the index name.
    pub file_name: Option<String>,
    /// Pretty-print with this many spaces per level. Compact output when `None`.
    pub indent: Option<usize>,
    /// Escape non-ASCII characters as `\uXXXX` so the file is pure ASCII.
    pub ascii: bool,
    /// Scroll batch size used to drain the index.
    pub batch_size: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            file_name: None,
            indent: None,
            ascii: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl DumpOptions {
    /// Set the file name (the `.json` extension is appended).
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Pretty-print the output.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    /// Escape non-ASCII characters in the output.
    pub fn escaping_non_ascii(mut self, ascii: bool) -> Self {
        self.ascii = ascii;
        self
    }
}
