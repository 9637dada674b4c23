//! Content-addressed intern tables for GridMap.
//!
//! This crate is the de-duplication engine. Placed objects
//! ([`ObjectInstance`]) and tile contents ([`Cell`]) are interned into a
//! [`Store`]: their canonical serialization is hashed, and semantically equal
//! content always collapses to one stored identity. Each identity tracks the
//! set of grid coordinates currently referencing it; when the last reference
//! is released the slot is tombstoned.
//!
//! # Design Rules
//!
//! 1. The canonical stored copy is never mutated in place; changes produce a
//!    new value, a new hash, and a re-intern.
//! 2. Everything handed back to callers (`fetch_*`, `contents`) is a
//!    detached copy; mutating it cannot corrupt canonical state.
//! 3. All table mutation goes through `intern_*` / `release_*`.
//! 4. Identities are sequential and never reused; a released identity stays
//!    dead, and equal content re-interned later gets a fresh identity.
//! 5. Unknown identities are hard lookup failures. Corruption of the hash
//!    index is fatal and never repaired silently.

pub mod cell;
pub mod error;
pub mod instance;
pub mod store;
pub mod table;

pub use cell::Cell;
pub use error::{StoreError, StoreResult};
pub use instance::{ObjectInstance, SetFlags};
pub use store::Store;
pub use table::{InternTable, Slot};
