use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use gridmap_proto::draw_order_of;
use gridmap_types::{ContentHash, InstanceId, Property, PropertyMap, SourceLoc, TypePath, Value};

/// Options for [`ObjectInstance::set`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SetFlags {
    /// Record the name in the must-serialize set.
    pub map_specified: bool,
}

/// A placed object: a prototype path plus the properties explicitly
/// overridden at this placement.
///
/// The canonical serialization `path{k1=v1;k2=v2;...}` (keys sorted, values
/// rendered per variant) is the dedup hash input. Its format is frozen;
/// changing it silently re-keys every existing hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub path: TypePath,
    /// Override properties only; inherited values stay in the prototype tree.
    pub properties: PropertyMap,
    /// Names that must always serialize, even when equal to the prototype's
    /// value.
    pub map_specified: BTreeSet<String>,
    /// Synthesized for a path missing from the prototype tree (forgiving
    /// lookups).
    pub missing: bool,
    /// Identity in the instance table; `None` until first interned.
    pub id: Option<InstanceId>,
}

impl ObjectInstance {
    pub fn new(path: TypePath) -> Self {
        Self {
            path,
            properties: PropertyMap::new(),
            map_specified: BTreeSet::new(),
            missing: false,
            id: None,
        }
    }

    /// A placeholder for a path the prototype tree no longer defines.
    pub fn placeholder(path: TypePath) -> Self {
        Self {
            missing: true,
            ..Self::new(path)
        }
    }

    /// The value of an override property. Absent names and explicit `null`
    /// both yield `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .map(|prop| &prop.value)
            .filter(|value| !value.is_null())
    }

    /// The value of an override property, or `default` when the name is
    /// absent or explicitly `null`.
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.get(name).cloned().unwrap_or(default)
    }

    /// Set an override property. The `Value` variant was chosen by the
    /// caller; `flags.map_specified` additionally records the name in the
    /// must-serialize set (once).
    pub fn set(&mut self, name: impl Into<String>, value: Value, flags: SetFlags) {
        let name = name.into();
        if flags.map_specified {
            self.map_specified.insert(name.clone());
        }
        self.properties
            .insert(name, Property::with_origin(value, SourceLoc::unknown()));
    }

    /// Remove an override property. Returns `true` if it was present.
    pub fn unset(&mut self, name: &str) -> bool {
        self.map_specified.remove(name);
        self.properties.remove(name).is_some()
    }

    /// The canonical serialization over all override properties: the frozen
    /// dedup hash input.
    pub fn canonical_serialize(&self) -> String {
        self.render(None)
    }

    /// The canonical serialization restricted to an allow-list (typically
    /// the `map_specified` set), for persistence collaborators.
    pub fn canonical_serialize_filtered(&self, allow: &BTreeSet<String>) -> String {
        self.render(Some(allow))
    }

    fn render(&self, allow: Option<&BTreeSet<String>>) -> String {
        let mut out = String::new();
        out.push_str(self.path.as_str());
        out.push('{');
        let mut first = true;
        for (name, prop) in &self.properties {
            if allow.is_some_and(|set| !set.contains(name)) {
                continue;
            }
            if !first {
                out.push(';');
            }
            first = false;
            out.push_str(name);
            out.push('=');
            out.push_str(&prop.value.to_string());
        }
        out.push('}');
        out
    }

    /// Content hash of the canonical serialization.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(&self.canonical_serialize())
    }

    /// Draw/processing order from the overridden `layer` property (0 when
    /// not overridden or unevaluable).
    pub fn draw_order(&self) -> f64 {
        draw_order_of(&self.properties)
    }
}

// Identity is path plus property map; the must-serialize set, the missing
// flag, and any previously stamped id never affect dedup.
impl PartialEq for ObjectInstance {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.properties == other.properties
    }
}

impl Eq for ObjectInstance {}

impl fmt::Display for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> ObjectInstance {
        ObjectInstance::new(TypePath::parse("/turf/wall").unwrap())
    }

    // -----------------------------------------------------------------------
    // Canonical serialization
    // -----------------------------------------------------------------------

    #[test]
    fn empty_instance_serializes_path_and_braces() {
        assert_eq!(wall().canonical_serialize(), "/turf/wall{}");
    }

    #[test]
    fn properties_serialize_in_sorted_key_order() {
        let mut instance = wall();
        instance.set("name", Value::Str("wall".into()), SetFlags::default());
        instance.set("dir", Value::number(2.0), SetFlags::default());
        assert_eq!(
            instance.canonical_serialize(),
            "/turf/wall{dir=2;name=\"wall\"}"
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut a = wall();
        a.set("a", Value::number(1.0), SetFlags::default());
        a.set("b", Value::number(2.0), SetFlags::default());
        let mut b = wall();
        b.set("b", Value::number(2.0), SetFlags::default());
        b.set("a", Value::number(1.0), SetFlags::default());
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn filtered_serialization_honors_the_allow_list() {
        let mut instance = wall();
        instance.set("icon", Value::FileRef("walls.dmi".into()), SetFlags::default());
        instance.set(
            "name",
            Value::Str("named wall".into()),
            SetFlags { map_specified: true },
        );
        assert_eq!(
            instance.canonical_serialize_filtered(&instance.map_specified),
            "/turf/wall{name=\"named wall\"}"
        );
    }

    // -----------------------------------------------------------------------
    // Property access
    // -----------------------------------------------------------------------

    #[test]
    fn get_skips_null() {
        let mut instance = wall();
        instance.set("desc", Value::null(), SetFlags::default());
        assert_eq!(instance.get("desc"), None);
        assert_eq!(instance.get("absent"), None);
    }

    #[test]
    fn get_or_falls_back_on_absent_and_null() {
        let mut instance = wall();
        instance.set("dir", Value::number(2.0), SetFlags::default());
        instance.set("desc", Value::null(), SetFlags::default());
        assert_eq!(instance.get_or("dir", Value::number(1.0)), Value::number(2.0));
        assert_eq!(instance.get_or("desc", Value::number(1.0)), Value::number(1.0));
        assert_eq!(instance.get_or("absent", Value::null()), Value::null());
    }

    #[test]
    fn map_specified_records_once() {
        let mut instance = wall();
        let flags = SetFlags { map_specified: true };
        instance.set("dir", Value::number(1.0), flags);
        instance.set("dir", Value::number(4.0), flags);
        assert_eq!(instance.map_specified.len(), 1);
    }

    #[test]
    fn unset_removes_property_and_flag() {
        let mut instance = wall();
        instance.set("dir", Value::number(1.0), SetFlags { map_specified: true });
        assert!(instance.unset("dir"));
        assert!(!instance.unset("dir"));
        assert!(instance.map_specified.is_empty());
        assert_eq!(instance.canonical_serialize(), "/turf/wall{}");
    }

    // -----------------------------------------------------------------------
    // Identity semantics
    // -----------------------------------------------------------------------

    #[test]
    fn equality_ignores_bookkeeping_fields() {
        let mut a = wall();
        let mut b = wall();
        a.id = Some(InstanceId::new(7));
        b.missing = true;
        b.map_specified.insert("dir".into());
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_differ() {
        let other = ObjectInstance::new(TypePath::parse("/turf/floor").unwrap());
        assert_ne!(wall(), other);
        assert_ne!(wall().content_hash(), other.content_hash());
    }

    #[test]
    fn placeholder_is_marked_missing() {
        let ghost = ObjectInstance::placeholder(TypePath::parse("/obj/gone").unwrap());
        assert!(ghost.missing);
        assert_eq!(ghost.canonical_serialize(), "/obj/gone{}");
    }

    #[test]
    fn draw_order_uses_the_layer_override() {
        let mut instance = wall();
        assert_eq!(instance.draw_order(), 0.0);
        instance.set("layer", Value::number(3.0), SetFlags::default());
        assert_eq!(instance.draw_order(), 3.0);
    }
}
