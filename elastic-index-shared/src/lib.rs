//! # Elastic Index Shared
//!
//! Backend-agnostic types shared by the index handle and its transports:
//! the dynamic document body and the bulk operation model.

mod bulk;
mod document;

pub use bulk::{BulkFailure, BulkOpType, BulkOperation, BulkResult};
pub use document::{identifier_from_value, Document};
