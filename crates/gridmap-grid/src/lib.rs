//! The layered GridMap grid.
//!
//! A [`Grid`] owns an ordered list of [`Layer`]s (one dense 2D array of cell
//! identities per elevation) and the [`Store`](gridmap_store::Store) those
//! identities index into. The arrays hold identities only — never cell
//! values — which is what makes de-duplication effective when thousands of
//! coordinates share identical content.
//!
//! Placement flows one way: resolve a prototype path into an
//! [`ObjectInstance`](gridmap_store::ObjectInstance), intern it, append its
//! identity to the target coordinate's cell, re-intern the cell, and write
//! the cell identity into the layer array. Every value read back out is a
//! detached copy.

pub mod error;
pub mod grid;
pub mod iter;
pub mod layer;

pub use error::{GridError, GridResult};
pub use grid::Grid;
pub use iter::CoordIter;
pub use layer::Layer;
