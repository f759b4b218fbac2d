//! Bulk operation engine.
//!
//! Turns documents into bulk actions, submits them as one request and
//! accounts for every action individually. Failed items never abort the
//! request; they are returned in the [`BulkResult`] and logged.

use tracing::{debug, error, info, instrument};

use crate::config::BulkOptions;
use crate::errors::SearchError;
use crate::handle::IndexHandle;
use crate::types::BulkItemStatus;
use elastic_index_shared::{
    identifier_from_value, BulkFailure, BulkOpType, BulkOperation, BulkResult, Document,
};

/// Cause recorded for update/delete actions that carry no identifier.
const MISSING_IDENTIFIER: &str = "missing document identifier";

/// Build one action per document.
///
/// With an identifier field configured, the identifier is taken from that
/// field (and removed from the payload unless `keep_id_field`). An empty
/// identifier counts as none.
pub(crate) fn build_operations(documents: Vec<Document>, options: &BulkOptions) -> Vec<BulkOperation> {
    documents
        .into_iter()
        .map(|mut document| {
            let id = options.identifier_field().and_then(|field| {
                let value = if options.keep_id_field {
                    document.get(field).cloned()
                } else {
                    document.remove(field)
                };
                value.as_ref().and_then(identifier_from_value)
            });

            match options.op_type {
                BulkOpType::Index => BulkOperation::index(id, document),
                BulkOpType::Update => BulkOperation::update(id, document, options.upsert),
                BulkOpType::Delete => BulkOperation::delete(id),
            }
        })
        .collect()
}

/// Match item statuses to submitted actions and tally the outcome.
///
/// `submitted` pairs each sent action with its position in the input. Items
/// are matched by order; actions without an item count as failed.
pub(crate) fn summarize(
    total: usize,
    submitted: &[(usize, &BulkOperation)],
    items: &[BulkItemStatus],
    mut failures: Vec<BulkFailure>,
) -> BulkResult {
    let mut succeeded = 0;

    for (i, (position, operation)) in submitted.iter().enumerate() {
        match items.get(i) {
            Some(item) if item.is_success() => succeeded += 1,
            Some(item) => failures.push(BulkFailure {
                position: *position,
                op_type: operation.op_type,
                id: item.id.clone().or_else(|| operation.id.clone()),
                status: Some(item.status),
                cause: item
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {}", item.status)),
            }),
            None => failures.push(BulkFailure {
                position: *position,
                op_type: operation.op_type,
                id: operation.id.clone(),
                status: None,
                cause: "no result reported for item".to_string(),
            }),
        }
    }

    failures.sort_by_key(|failure| failure.position);

    BulkResult {
        total,
        succeeded,
        failures,
    }
}

impl IndexHandle {
    /// Apply one action per document in a single bulk request.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents to index, update or delete
    /// * `options` - Identifier field, action, upsert and id-field handling
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResult)` - One outcome per document; `succeeded + failed == total`
    /// * `Err(SearchError)` - Only if the request as a whole failed
    #[instrument(
        skip(self, documents, options),
        fields(index = %self.index, op_type = %options.op_type, document_count = documents.len())
    )]
    pub async fn bulk_apply(
        &self,
        documents: Vec<Document>,
        options: &BulkOptions,
    ) -> Result<BulkResult, SearchError> {
        let total = documents.len();
        if total == 0 {
            return Ok(BulkResult::empty());
        }

        let operations = build_operations(documents, options);

        let mut local_failures = Vec::new();
        let mut submitted = Vec::with_capacity(operations.len());
        for (position, operation) in operations.iter().enumerate() {
            if operation.is_addressable() {
                submitted.push((position, operation));
            } else {
                local_failures.push(BulkFailure {
                    position,
                    op_type: operation.op_type,
                    id: None,
                    status: None,
                    cause: MISSING_IDENTIFIER.to_string(),
                });
            }
        }

        info!(
            index = %self.index,
            op_type = %options.op_type,
            count = submitted.len(),
            "Starting bulk request"
        );

        let items = if submitted.is_empty() {
            Vec::new()
        } else {
            let batch: Vec<BulkOperation> = submitted.iter().map(|(_, op)| (*op).clone()).collect();
            self.transport
                .bulk(&self.index, &self.category, &batch)
                .await?
        };

        let result = summarize(total, &submitted, &items, local_failures);

        info!(
            index = %self.index,
            op_type = %options.op_type,
            succeeded = result.succeeded,
            "Bulk documents processed successfully"
        );
        if !result.is_success() {
            error!(
                index = %self.index,
                op_type = %options.op_type,
                failed = result.failed(),
                "Bulk documents could not be processed"
            );
            for failure in &result.failures {
                error!(index = %self.index, failure = %failure, "Bulk item failed");
            }
        }
        debug!(index = %self.index, op_type = %options.op_type, "Finished bulk request");

        Ok(result)
    }
}
