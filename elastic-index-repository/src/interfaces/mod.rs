//! Interface definitions for the search transport.
//!
//! This module defines the abstract `SearchTransport` trait that the index
//! handle talks through, allowing the OpenSearch backend to be swapped for a
//! test double.

mod search_transport;

pub use search_transport::SearchTransport;
