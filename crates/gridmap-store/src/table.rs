//! The generic content-addressed intern table.
//!
//! One table maps canonical content to a stable small-integer identity: the
//! slot index. A hash index (`ContentHash` → identity) makes equal content
//! collapse to one slot, and each live slot tracks the grid coordinates
//! currently referencing it. Releasing the last coordinate tombstones the
//! slot: the `Vec` entry becomes `None`, the hash mapping is dropped, and
//! the identity is never handed out again.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::debug;

use gridmap_types::{CellId, ContentHash, Coord, InstanceId};

use crate::error::{StoreError, StoreResult};

/// A table identity: a typed wrapper over a slot index that knows how to
/// report its own lookup failure.
pub trait Identity: Copy + Eq + Hash + fmt::Display {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
    /// The lookup-failure error for this identity.
    fn missing(self) -> StoreError;
}

impl Identity for InstanceId {
    fn from_index(index: usize) -> Self {
        InstanceId::from_index(index)
    }

    fn index(self) -> usize {
        InstanceId::index(self)
    }

    fn missing(self) -> StoreError {
        StoreError::UnknownInstance(self)
    }
}

impl Identity for CellId {
    fn from_index(index: usize) -> Self {
        CellId::from_index(index)
    }

    fn index(self) -> usize {
        CellId::index(self)
    }

    fn missing(self) -> StoreError {
        StoreError::UnknownCell(self)
    }
}

/// A live table slot: the canonical copy of the content, its hash, and the
/// coordinates referencing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot<T> {
    pub value: T,
    pub hash: ContentHash,
    pub locations: BTreeSet<Coord>,
}

/// Content-addressed intern table with coordinate reference tracking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InternTable<I, T> {
    /// Slot storage; `None` marks a tombstoned identity.
    slots: Vec<Option<Slot<T>>>,
    by_hash: HashMap<ContentHash, I>,
    tombstones: usize,
    #[serde(skip)]
    _identity: PhantomData<I>,
}

impl<I: Identity, T: Clone> InternTable<I, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            by_hash: HashMap::new(),
            tombstones: 0,
            _identity: PhantomData,
        }
    }

    /// Slots ever allocated, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Live (non-tombstoned) slots.
    pub fn live_len(&self) -> usize {
        self.slots.len() - self.tombstones
    }

    pub fn is_empty(&self) -> bool {
        self.live_len() == 0
    }

    /// Intern content under its hash.
    ///
    /// An unseen hash allocates the next sequential identity and stores a
    /// detached copy; a known hash returns the canonical identity (callers
    /// holding a different identity for equal content must adopt this one).
    /// When `at` is given, the coordinate is recorded against the slot
    /// (idempotent).
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptTable`] if the hash index points at a vacated
    /// slot.
    pub fn intern(&mut self, value: &T, hash: ContentHash, at: Option<Coord>) -> StoreResult<I> {
        let id = match self.by_hash.get(&hash) {
            Some(&id) => {
                if self.slot_ref(id).is_none() {
                    return Err(StoreError::CorruptTable(format!(
                        "hash {} maps to vacated slot {id}",
                        hash.short_hex()
                    )));
                }
                id
            }
            None => {
                let id = I::from_index(self.slots.len());
                self.slots.push(Some(Slot {
                    value: value.clone(),
                    hash,
                    locations: BTreeSet::new(),
                }));
                self.by_hash.insert(hash, id);
                debug!(id = %id, hash = %hash.short_hex(), "interned new content");
                id
            }
        };
        if let Some(coord) = at {
            if let Some(slot) = self.slot_mut(id) {
                slot.locations.insert(coord);
            }
        }
        Ok(id)
    }

    /// Remove a coordinate reference. When the last reference goes, the slot
    /// is tombstoned and its hash mapping dropped; returns `true` in that
    /// case.
    ///
    /// # Errors
    ///
    /// The identity's lookup failure if it is unknown or already tombstoned;
    /// [`StoreError::CorruptTable`] if the tombstoned slot's hash mapping
    /// was missing or pointed elsewhere.
    pub fn release(&mut self, id: I, coord: Coord) -> StoreResult<bool> {
        let entry = self
            .slots
            .get_mut(id.index())
            .ok_or_else(|| id.missing())?;
        let slot = entry.as_mut().ok_or_else(|| id.missing())?;
        slot.locations.remove(&coord);
        if !slot.locations.is_empty() {
            return Ok(false);
        }

        let hash = slot.hash;
        *entry = None;
        self.tombstones += 1;
        match self.by_hash.remove(&hash) {
            Some(mapped) if mapped == id => {}
            Some(mapped) => {
                return Err(StoreError::CorruptTable(format!(
                    "hash {} of released slot {id} was mapped to {mapped}",
                    hash.short_hex()
                )));
            }
            None => {
                return Err(StoreError::CorruptTable(format!(
                    "released slot {id} had no hash mapping"
                )));
            }
        }
        debug!(id = %id, hash = %hash.short_hex(), "tombstoned unreferenced content");
        Ok(true)
    }

    /// Borrow a live slot.
    pub fn get(&self, id: I) -> StoreResult<&Slot<T>> {
        self.slot_ref(id).ok_or_else(|| id.missing())
    }

    /// The identity currently interned for a hash, if any.
    pub fn find(&self, hash: &ContentHash) -> Option<I> {
        self.by_hash.get(hash).copied()
    }

    /// Iterate over live slots in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &Slot<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|slot| (I::from_index(index), slot)))
    }

    fn slot_ref(&self, id: I) -> Option<&Slot<T>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: I) -> Option<&mut Slot<T>> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }
}

impl<I: Identity, T: Clone> Default for InternTable<I, T> {
    fn default() -> Self {
        Self::new()
    }
}
