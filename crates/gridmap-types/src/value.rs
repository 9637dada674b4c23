use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed property value.
///
/// The variant is chosen explicitly at construction time and fixes the
/// canonical rendering: `Raw` prints its literal text (or `null`), `Str`
/// double-quotes, `FileRef` single-quotes, and `List` prints `list(...)`.
/// That rendering is the hash input for de-duplication, so two values are
/// equal exactly when their renderings are equal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// Numbers, constants, and unevaluated formula text. `None` renders as
    /// `null`.
    Raw(Option<String>),
    /// A string, rendered double-quoted.
    Str(String),
    /// A resource file reference, rendered single-quoted.
    FileRef(String),
    /// An ordered list, possibly with associated keys.
    List(Vec<ListEntry>),
}

/// One entry of a [`Value::List`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ListEntry {
    /// A plain element.
    Item(Value),
    /// A `key = value` association.
    Assoc(Value, Value),
}

impl Value {
    /// The null raw value.
    pub const fn null() -> Self {
        Value::Raw(None)
    }

    /// A raw numeric value. Whole numbers render without a decimal point so
    /// that `3.0` and `3` hash identically.
    pub fn number(n: f64) -> Self {
        let text = if n.is_finite() && n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            format!("{n}")
        };
        Value::Raw(Some(text))
    }

    /// A raw value holding the given literal text.
    pub fn raw(text: impl Into<String>) -> Self {
        Value::Raw(Some(text.into()))
    }

    /// Returns `true` for the null raw value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Raw(None))
    }

    /// Parse this value as a number, if it is raw numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Raw(Some(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// The literal text of a raw value, if any.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Value::Raw(Some(text)) => Some(text),
            _ => None,
        }
    }

    /// The string content of a `Str` value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Raw(None) => write!(f, "null"),
            Value::Raw(Some(text)) => write!(f, "{text}"),
            Value::Str(text) => write!(f, "\"{text}\""),
            Value::FileRef(text) => write!(f, "'{text}'"),
            Value::List(entries) => {
                write!(f, "list(")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match entry {
                        ListEntry::Item(value) => write!(f, "{value}")?,
                        ListEntry::Assoc(key, value) => write!(f, "{key} = {value}")?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

// Equality is defined on the canonical rendering, which is what the dedup
// hash sees. Structurally distinct values that render identically (e.g.
// `Raw(None)` and raw text `null`) are the same value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Value {}
