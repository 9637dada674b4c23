//! The GridMap prototype tree.
//!
//! A prototype is a class-like template with an absolute path, a typed
//! property map, and an inheritance chain. Prototypes live in a
//! [`PrototypeArena`] and reference each other through [`ProtoId`] handles,
//! never through owning pointers, so the parent back-reference cannot form an
//! ownership cycle.
//!
//! # Resolution
//!
//! [`PrototypeArena::resolve_all`] walks the tree parent-before-child and
//! copies every ancestor property a node does not override, marking each copy
//! `inherited`. Resolution is memoized per node and idempotent. Parent links
//! that do not form a tree are detected and rejected rather than looping.
//!
//! # Draw order
//!
//! The `layer` property gives draw/processing order. It may be a number or a
//! small arithmetic formula (`"2.1 + 0.01"`); [`draw_order_of`] evaluates it
//! and falls back to `0` on any failure, logging rather than erroring, so one
//! malformed property never aborts a load.

pub mod arena;
pub mod error;
pub mod expr;
pub mod prototype;

pub use arena::{PrototypeArena, ProtoId};
pub use error::{ProtoError, ProtoResult};
pub use expr::{draw_order_of, draw_order_value, eval, LAYER_PROPERTY};
pub use prototype::Prototype;
