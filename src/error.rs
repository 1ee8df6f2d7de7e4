use std::collections::TryReserveError;
use thiserror::Error;

/// Failures surfaced by table construction and growth.
///
/// A failed growth aborts the `set` that triggered it; the table keeps its
/// previous bucket array and contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("bucket array allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),
    #[error("bucket count does not fit in usize")]
    CapacityOverflow,
}
