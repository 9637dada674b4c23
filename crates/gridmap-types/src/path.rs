use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An absolute, slash-separated prototype path, e.g. `/turf/floor`.
///
/// The bare root path is `/`. Paths are validated at construction: they must
/// start with `/` and contain no empty segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypePath(String);

impl TypePath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and validate a path string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw == "/" {
            return Ok(Self::root());
        }
        if !raw.starts_with('/') || raw.ends_with('/') {
            return Err(TypeError::InvalidPath(raw.to_string()));
        }
        if raw[1..].split('/').any(str::is_empty) {
            return Err(TypeError::InvalidPath(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The path segments, root-first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<TypePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Append a child segment.
    pub fn join(&self, name: &str) -> TypePath {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }
}

impl fmt::Debug for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypePath({})", self.0)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
