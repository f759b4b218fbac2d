//! OpenSearch implementation of the search transport.
//!
//! This module provides a concrete implementation of `SearchTransport`
//! using OpenSearch as the backend.

mod client;
pub mod index_config;
pub mod queries;

pub use client::OpenSearchTransport;
pub use index_config::{create_index_body, default_settings};
