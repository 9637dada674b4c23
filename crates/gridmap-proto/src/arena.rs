//! Arena storage for the prototype tree.
//!
//! Nodes are stored in a `Vec` and reference each other through [`ProtoId`]
//! handles. The parent back-reference is a handle, not a pointer, so the
//! tree has single ownership with no reference cycles to manage.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use gridmap_types::{Property, TypePath};

use crate::error::{ProtoError, ProtoResult};
use crate::prototype::Prototype;

/// Handle to a prototype in its arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtoId(u32);

impl ProtoId {
    pub const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtoId(#{})", self.0)
    }
}

/// The prototype tree: an arena of [`Prototype`] nodes rooted at `/`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrototypeArena {
    nodes: Vec<Prototype>,
    by_path: HashMap<TypePath, ProtoId>,
    root: ProtoId,
}

impl PrototypeArena {
    /// Create an arena holding only the root prototype `/`.
    pub fn new() -> Self {
        let root = ProtoId::from_index(0);
        let mut by_path = HashMap::new();
        by_path.insert(TypePath::root(), root);
        Self {
            nodes: vec![Prototype::new(TypePath::root(), None)],
            by_path,
            root,
        }
    }

    /// Handle of the root prototype.
    pub fn root(&self) -> ProtoId {
        self.root
    }

    /// Number of prototypes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node. A handle not minted by this arena is a hard error.
    pub fn get(&self, id: ProtoId) -> ProtoResult<&Prototype> {
        self.nodes
            .get(id.index())
            .ok_or(ProtoError::UnknownHandle(id))
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, id: ProtoId) -> ProtoResult<&mut Prototype> {
        self.nodes
            .get_mut(id.index())
            .ok_or(ProtoError::UnknownHandle(id))
    }

    /// Find a prototype by path.
    pub fn lookup(&self, path: &TypePath) -> Option<ProtoId> {
        self.by_path.get(path).copied()
    }

    /// Insert a prototype at `path`, creating any missing ancestors.
    /// Idempotent: an existing node is returned as-is.
    pub fn insert(&mut self, path: &TypePath) -> ProtoId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        // Non-root paths always have a parent; the root was seeded in new().
        let Some(parent_path) = path.parent() else {
            return self.root;
        };
        let parent = self.insert(&parent_path);
        let id = ProtoId::from_index(self.nodes.len());
        self.nodes.push(Prototype::new(path.clone(), Some(parent)));
        self.by_path.insert(path.clone(), id);
        let name = path.name().unwrap_or_default().to_string();
        self.nodes[parent.index()].children.insert(name, id);
        id
    }

    /// Iterate over all nodes in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (ProtoId, &Prototype)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ProtoId::from_index(i), node))
    }

    // ---------------------------------------------------------------
    // Inheritance resolution
    // ---------------------------------------------------------------

    /// Resolve inheritance for the whole tree.
    ///
    /// Walks parent-before-child from the root. Each unresolved node copies
    /// every parent property it does not override, marked `inherited`, then
    /// is flagged resolved; re-running is a no-op. Child links that revisit
    /// a node, or nodes unreachable from the root, fail fast with
    /// [`ProtoError::CycleDetected`].
    pub fn resolve_all(&mut self) -> ProtoResult<()> {
        let mut visited = vec![false; self.nodes.len()];
        visited[self.root.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back(self.root);

        while let Some(id) = queue.pop_front() {
            self.resolve_node(id)?;
            let children: Vec<ProtoId> = self.get(id)?.children.values().copied().collect();
            for child in children {
                let seen = visited
                    .get_mut(child.index())
                    .ok_or(ProtoError::UnknownHandle(child))?;
                if *seen {
                    return Err(ProtoError::CycleDetected(self.get(child)?.path.clone()));
                }
                *seen = true;
                queue.push_back(child);
            }
        }

        // A node the walk never reached has a broken or circular parent
        // chain.
        if let Some(index) = visited.iter().position(|seen| !seen) {
            return Err(ProtoError::CycleDetected(self.nodes[index].path.clone()));
        }
        Ok(())
    }

    /// Apply inheritance to one node whose parent is already resolved.
    fn resolve_node(&mut self, id: ProtoId) -> ProtoResult<()> {
        let node = self.get(id)?;
        if node.resolved {
            return Ok(());
        }
        let copies: Vec<(String, Property)> = match node.parent {
            None => Vec::new(),
            Some(parent) => self
                .get(parent)?
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), prop.inherit()))
                .collect(),
        };
        let node = self.get_mut(id)?;
        for (name, prop) in copies {
            node.properties.entry(name).or_insert(prop);
        }
        node.resolved = true;
        Ok(())
    }
}

impl Default for PrototypeArena {
    fn default() -> Self {
        Self::new()
    }
}
