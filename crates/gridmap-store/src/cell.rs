use std::fmt;

use serde::{Deserialize, Serialize};

use gridmap_types::{CellId, InstanceId};

/// One grid position's contents: an ordered sequence of object-instance
/// identities.
///
/// A cell holds identities only; the instances themselves live in the store.
/// Its canonical serialization therefore needs the instance table and lives
/// on [`Store`](crate::Store).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cell {
    pub members: Vec<InstanceId>,
    /// Identity in the cell table; `None` until first interned.
    pub id: Option<CellId>,
}

impl Cell {
    /// An empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[InstanceId] {
        &self.members
    }

    /// Append an instance identity. The previously stamped cell identity no
    /// longer describes this content.
    pub fn append(&mut self, instance: InstanceId) {
        self.members.push(instance);
        self.id = None;
    }

    /// Remove the first occurrence of an instance identity. Returns `true`
    /// if one was removed.
    pub fn remove(&mut self, instance: InstanceId) -> bool {
        match self.members.iter().position(|&m| m == instance) {
            Some(index) => {
                self.members.remove(index);
                self.id = None;
                true
            }
            None => false,
        }
    }

    /// How many times an instance identity occurs in this cell.
    pub fn count_of(&self, instance: InstanceId) -> usize {
        self.members.iter().filter(|&&m| m == instance).count()
    }
}

// Identity is the member sequence; a previously stamped id is bookkeeping.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for Cell {}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{member}")?;
        }
        write!(f, "]")
    }
}
