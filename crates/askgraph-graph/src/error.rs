//! Execution errors surfaced by the graph store adapter.

use std::time::Duration;

use thiserror::Error;

/// Failure of a graph-store call. Distinct from an empty result, which is
/// a successful call that matched nothing.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph store connection failed: {0}")]
    Connect(String),

    #[error("Graph query failed: {0}")]
    Query(String),

    #[error("Graph query timed out after {0:?}")]
    Timeout(Duration),
}
