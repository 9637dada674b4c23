use gridmap_types::{CellId, InstanceId};
use thiserror::Error;

/// Errors from intern-table operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No live object instance with this identity (never interned, or
    /// released and tombstoned).
    #[error("unknown object instance {0}")]
    UnknownInstance(InstanceId),

    /// No live cell with this identity.
    #[error("unknown cell {0}")]
    UnknownCell(CellId),

    /// The hash index and the slot table disagree. This is a structural
    /// invariant violation: processing must stop.
    #[error("intern table corruption: {0}")]
    CorruptTable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
