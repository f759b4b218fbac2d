//! Error types for the elastic index repository.

mod search_error;

pub use search_error::SearchError;
