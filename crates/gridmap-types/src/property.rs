use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Where a property was declared: source file and line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Provenance for values synthesized at runtime rather than read from a
    /// definition file.
    pub fn unknown() -> Self {
        Self::default()
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A property: a [`Value`] plus provenance and inheritance bookkeeping.
///
/// Only the value participates in equality and hashing; provenance and the
/// flags are carried for tooling but never affect identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property {
    pub value: Value,
    pub origin: SourceLoc,
    /// Copied down from an ancestor prototype during resolution.
    pub inherited: bool,
    /// Declared with a `var` form rather than assigned.
    pub declaration: bool,
    /// Declaration modifier (`global`, `const`, ...), if any.
    pub modifier: Option<String>,
    /// Declared list size, if any.
    pub size_hint: Option<usize>,
}

impl Property {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            origin: SourceLoc::unknown(),
            inherited: false,
            declaration: false,
            modifier: None,
            size_hint: None,
        }
    }

    pub fn with_origin(value: Value, origin: SourceLoc) -> Self {
        Self {
            origin,
            ..Self::new(value)
        }
    }

    /// A copy of this property marked as inherited, for resolution.
    pub fn inherit(&self) -> Self {
        let mut copy = self.clone();
        copy.inherited = true;
        copy
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Property {}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Name-to-property map. `BTreeMap` gives order-independent comparison and
/// sorted-key canonical serialization in one structure.
pub type PropertyMap = BTreeMap<String, Property>;
