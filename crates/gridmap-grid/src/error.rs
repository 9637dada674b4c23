use gridmap_proto::ProtoError;
use gridmap_store::StoreError;
use gridmap_types::{Coord, TypePath};
use thiserror::Error;

/// Errors from grid operations.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// A coordinate outside the addressed layer's dimensions.
    #[error("coordinate {0} is out of bounds")]
    OutOfBounds(Coord),

    /// No layer at this elevation.
    #[error("no layer at elevation {0}")]
    UnknownLayer(u32),

    /// A placement path the prototype tree does not define (strict mode).
    #[error("unknown prototype path {0}")]
    UnknownPrototype(TypePath),

    /// Intern-table failure (lookup or corruption).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Prototype-tree failure.
    #[error(transparent)]
    Proto(#[from] ProtoError),
}

/// Result alias for grid operations.
pub type GridResult<T> = Result<T, GridError>;
