//! Reindex and dump pipelines.
//!
//! Both drain the index through a scroll cursor. Reindex feeds every batch
//! into a bulk request against the target index; dump collects the batches
//! and writes them as one JSON array.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{error, info, instrument, warn};

use crate::config::{BulkOptions, DumpOptions, IndexOptions, ReindexOptions, ScrollOptions};
use crate::errors::SearchError;
use crate::handle::IndexHandle;
use crate::interfaces::SearchTransport;
use crate::opensearch::OpenSearchTransport;
use crate::scroll::ScrollCursor;
use crate::types::{DumpSummary, ReindexReport};
use elastic_index_shared::{BulkResult, Document};

/// Encode documents as a JSON array, pretty-printed when an indent is given.
fn encode_documents(documents: &[Document], options: &DumpOptions) -> Result<Vec<u8>, SearchError> {
    let out = match options.indent {
        None => serde_json::to_vec(documents)?,
        Some(width) => {
            let indent = vec![b' '; width];
            let mut out = Vec::new();
            let mut serializer =
                Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
            documents.serialize(&mut serializer)?;
            out
        }
    };

    if !options.ascii {
        return Ok(out);
    }
    let text = String::from_utf8(out)
        .map_err(|e| SearchError::SerializationError(e.to_string()))?;
    Ok(escape_non_ascii(&text).into_bytes())
}

/// Replace every non-ASCII character with its `\uXXXX` escape.
///
/// Outside strings, encoded JSON is pure ASCII, so escaping the whole text
/// only touches string contents. Characters beyond the BMP become a
/// surrogate pair.
fn escape_non_ascii(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut units = [0u16; 2];
    for c in text.chars() {
        if c.is_ascii() {
            escaped.push(c);
            continue;
        }
        for unit in c.encode_utf16(&mut units) {
            escaped.push_str(&format!("\\u{:04x}", unit));
        }
    }
    escaped
}

/// Release the source scroll once a reindex gives up on it.
async fn close_after_failure(cursor: &mut ScrollCursor) {
    if let Err(e) = cursor.close().await {
        warn!(error = %e, "Failed to close scroll after reindex failure");
    }
}

impl IndexHandle {
    /// Resolve the target options: unset overrides fall back to this handle's
    /// endpoint, mapping and timeout. Settings are not inherited.
    fn reindex_target_options(&self, options: &ReindexOptions) -> IndexOptions {
        IndexOptions {
            endpoint_url: options
                .endpoint_url
                .clone()
                .unwrap_or_else(|| self.options.endpoint_url.clone()),
            mapping: options.mapping.clone().or_else(|| self.options.mapping.clone()),
            settings: options.settings.clone(),
            timeout: options.timeout.unwrap_or(self.options.timeout),
            replace_existing: options.replace_existing,
        }
    }

    /// Reuse this handle's transport when the target lives on the same endpoint
    /// with the same timeout.
    fn reindex_transport(
        &self,
        target: &IndexOptions,
    ) -> Result<Arc<dyn SearchTransport>, SearchError> {
        if target.endpoint_url == self.transport.endpoint() && target.timeout == self.options.timeout {
            return Ok(Arc::clone(&self.transport));
        }
        let transport = OpenSearchTransport::new(&target.endpoint_url, target.timeout)?;
        Ok(Arc::new(transport))
    }

    /// Copy every document into another index.
    ///
    /// The target is opened (and created if needed) with this handle's endpoint,
    /// category and mapping unless overridden. The source is drained by scroll
    /// and each batch is bulk-indexed, taking identifiers from
    /// `identifier_field` (engine-assigned when `None`).
    ///
    /// # Returns
    ///
    /// * `Ok(ReindexReport)` - The target handle and the outcome aggregated over all batches
    /// * `Err(SearchError)` - If opening the target, a scroll fetch or a whole bulk request failed
    #[instrument(skip(self, options), fields(source = %self.index))]
    pub async fn reindex(
        &self,
        target: &str,
        identifier_field: Option<&str>,
        options: ReindexOptions,
    ) -> Result<ReindexReport, SearchError> {
        let target_options = self.reindex_target_options(&options);
        let category = options
            .category
            .clone()
            .unwrap_or_else(|| self.category.clone());
        let transport = self.reindex_transport(&target_options)?;
        let target = IndexHandle::open_with_transport(transport, target, category, target_options).await?;

        // Copies keep the identifier field so the target matches the source.
        let bulk_options = BulkOptions {
            identifier_field: identifier_field.map(str::to_string),
            keep_id_field: true,
            ..BulkOptions::default()
        };

        let mut cursor = self.scroll(None, ScrollOptions::default().with_size(options.batch_size));
        let mut result = BulkResult::empty();
        let mut batches = 0;

        loop {
            let batch = match cursor.next_batch().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    close_after_failure(&mut cursor).await;
                    error!(batch = batches + 1, error = %e, "Reindex aborted: scroll fetch failed");
                    return Err(e);
                }
            };
            batches += 1;
            match target.bulk_apply(batch, &bulk_options).await {
                Ok(batch_result) => result.merge(batch_result),
                Err(e) => {
                    close_after_failure(&mut cursor).await;
                    error!(batch = batches, error = %e, "Reindex aborted: bulk request failed");
                    return Err(e);
                }
            }
        }

        info!(
            source = %self.index,
            target = %target.index,
            batches,
            succeeded = result.succeeded,
            failed = result.failed(),
            "Reindex completed"
        );
        if !result.is_success() {
            error!(
                target = %target.index,
                failed = result.failed(),
                "Some documents were not copied"
            );
        }

        Ok(ReindexReport {
            target,
            result,
            batches,
        })
    }

    /// Export every document to `directory/<file_name>.json`.
    ///
    /// The file holds a single JSON array of the unpacked documents. The whole
    /// export is held in memory before writing.
    #[instrument(skip(self, directory, options), fields(index = %self.index))]
    pub async fn dump(
        &self,
        directory: impl AsRef<Path>,
        options: DumpOptions,
    ) -> Result<DumpSummary, SearchError> {
        let mut cursor = self.scroll(None, ScrollOptions::default().with_size(options.batch_size));
        let documents = cursor.drain().await?;

        let bytes = encode_documents(&documents, &options)?;

        let directory = directory.as_ref();
        tokio::fs::create_dir_all(directory).await?;
        let file_name = format!("{}.json", options.file_name.as_deref().unwrap_or(&self.index));
        let path = directory.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        info!(
            index = %self.index,
            path = %path.display(),
            documents = documents.len(),
            "Dumped index"
        );

        Ok(DumpSummary {
            path,
            documents: documents.len(),
            written_at: Utc::now(),
        })
    }
}
