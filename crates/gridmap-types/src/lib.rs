//! Foundation types for GridMap.
//!
//! This crate provides the value, identity, and coordinate types used
//! throughout the GridMap data model. Every other GridMap crate depends on
//! `gridmap-types`.
//!
//! # Key Types
//!
//! - [`Value`] — Tagged property value with a deterministic canonical rendering
//! - [`Property`] — A value plus provenance and inheritance flags
//! - [`ContentHash`] — BLAKE3 hash of a canonical rendering, the dedup key
//! - [`InstanceId`] / [`CellId`] — Small-integer intern-table identities
//! - [`Coord`] — A grid position (x, y, elevation)
//! - [`TypePath`] — Absolute, slash-separated prototype path

pub mod coord;
pub mod error;
pub mod id;
pub mod path;
pub mod property;
pub mod value;

pub use coord::Coord;
pub use error::TypeError;
pub use id::{CellId, ContentHash, InstanceId};
pub use path::TypePath;
pub use property::{Property, PropertyMap, SourceLoc};
pub use value::{ListEntry, Value};
