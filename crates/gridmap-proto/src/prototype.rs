use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use gridmap_types::{Property, PropertyMap, SourceLoc, TypePath, Value};

use crate::arena::ProtoId;
use crate::expr;

/// A class-like template: a node of the prototype tree.
///
/// Before resolution the property map holds only locally declared
/// properties; afterwards it also holds every ancestor property not locally
/// overridden, each marked `inherited`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub path: TypePath,
    pub properties: PropertyMap,
    /// Child nodes by segment name.
    pub children: BTreeMap<String, ProtoId>,
    /// Back-reference into the arena; `None` only for the root.
    pub parent: Option<ProtoId>,
    /// Whether inheritance has been applied to this node.
    pub resolved: bool,
    pub origin: SourceLoc,
}

impl Prototype {
    pub fn new(path: TypePath, parent: Option<ProtoId>) -> Self {
        Self {
            path,
            properties: PropertyMap::new(),
            children: BTreeMap::new(),
            parent,
            resolved: false,
            origin: SourceLoc::unknown(),
        }
    }

    /// The value of a property. Absent names and explicit `null` values both
    /// yield `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .map(|prop| &prop.value)
            .filter(|value| !value.is_null())
    }

    /// The value of a property, or `default` when the name is absent or
    /// explicitly `null`.
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.get(name).cloned().unwrap_or(default)
    }

    /// The full property record, including provenance and flags.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Set a property. The value variant was chosen by the caller at
    /// construction; this only records it with its provenance.
    pub fn set(&mut self, name: impl Into<String>, value: Value, origin: SourceLoc) {
        self.properties
            .insert(name.into(), Property::with_origin(value, origin));
    }

    /// Draw/processing order from the `layer` property (0 when absent or
    /// unevaluable).
    pub fn draw_order(&self) -> f64 {
        expr::draw_order_of(&self.properties)
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
