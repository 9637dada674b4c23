use gridmap_types::TypePath;
use thiserror::Error;

use crate::arena::ProtoId;

/// Errors from prototype-tree operations.
#[derive(Debug, Error, PartialEq)]
pub enum ProtoError {
    /// A handle does not name a node in this arena (stale or foreign handle).
    #[error("unknown prototype handle {0:?}")]
    UnknownHandle(ProtoId),

    /// Parent links do not form a tree rooted at `/`.
    #[error("prototype parent links form a cycle at {0}")]
    CycleDetected(TypePath),

    /// A formula-valued property failed to evaluate.
    #[error("failed to evaluate {expr:?}: {reason}")]
    Expression { expr: String, reason: String },
}

/// Result alias for prototype operations.
pub type ProtoResult<T> = Result<T, ProtoError>;
