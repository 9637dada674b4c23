use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use gridmap_types::{CellId, ContentHash, Coord, InstanceId};

use crate::cell::Cell;
use crate::error::StoreResult;
use crate::instance::ObjectInstance;
use crate::table::{InternTable, Slot};

/// The canonical tables: object instances and cells, each content-addressed
/// and reference-counted by coordinate.
///
/// A `Store` is an explicit value passed by reference to everything that
/// needs it — never a global — so tests get fresh, isolated stores. All
/// canonical-table mutation goes through `intern_*` / `release_*`; every
/// value handed out is a detached copy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Store {
    instances: InternTable<InstanceId, ObjectInstance>,
    cells: InternTable<CellId, Cell>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Object instances
    // ---------------------------------------------------------------

    /// Intern an object instance, stamping its identity. Equal content
    /// (path + properties) always yields the identity already in the table;
    /// an identity the caller held before is overwritten by the canonical
    /// one.
    pub fn intern_object(
        &mut self,
        instance: &mut ObjectInstance,
        at: Option<Coord>,
    ) -> StoreResult<InstanceId> {
        let hash = instance.content_hash();
        let id = self.instances.intern(instance, hash, at)?;
        instance.id = Some(id);
        Ok(id)
    }

    /// A detached copy of the canonical instance, with its identity stamped.
    pub fn fetch_object(&self, id: InstanceId) -> StoreResult<ObjectInstance> {
        let mut copy = self.instances.get(id)?.value.clone();
        copy.id = Some(id);
        Ok(copy)
    }

    /// Release one coordinate's claim on an instance identity. Returns
    /// `true` if the slot was tombstoned.
    pub fn release_object(&mut self, id: InstanceId, coord: Coord) -> StoreResult<bool> {
        self.instances.release(id, coord)
    }

    /// Coordinates currently referencing an instance identity.
    pub fn object_locations(&self, id: InstanceId) -> StoreResult<&BTreeSet<Coord>> {
        Ok(&self.instances.get(id)?.locations)
    }

    /// Live instance count.
    pub fn object_count(&self) -> usize {
        self.instances.live_len()
    }

    /// Iterate over live instances in identity order.
    pub fn objects(&self) -> impl Iterator<Item = (InstanceId, &ObjectInstance)> {
        self.instances.iter().map(|(id, slot)| (id, &slot.value))
    }

    // ---------------------------------------------------------------
    // Cells
    // ---------------------------------------------------------------

    /// The canonical serialization of a cell: the comma-joined canonical
    /// text of its resolvable members. Members that no longer resolve are
    /// skipped with a warning, mirroring [`contents`](Store::contents).
    pub fn cell_canonical(&self, cell: &Cell) -> String {
        let mut parts = Vec::with_capacity(cell.len());
        for &member in cell.members() {
            match self.instances.get(member) {
                Ok(slot) => parts.push(slot.value.canonical_serialize()),
                Err(_) => {
                    warn!(instance = %member, "cell member no longer resolves, skipping");
                }
            }
        }
        parts.join(",")
    }

    /// Content hash of a cell's canonical serialization.
    pub fn cell_hash(&self, cell: &Cell) -> ContentHash {
        ContentHash::of(&self.cell_canonical(cell))
    }

    /// Intern a cell, stamping its identity.
    pub fn intern_cell(&mut self, cell: &mut Cell, at: Option<Coord>) -> StoreResult<CellId> {
        let hash = self.cell_hash(cell);
        let id = self.cells.intern(cell, hash, at)?;
        cell.id = Some(id);
        Ok(id)
    }

    /// A detached copy of the canonical cell, with its identity stamped.
    pub fn fetch_cell(&self, id: CellId) -> StoreResult<Cell> {
        let mut copy = self.cells.get(id)?.value.clone();
        copy.id = Some(id);
        Ok(copy)
    }

    /// Release one coordinate's claim on a cell identity. Returns `true` if
    /// the slot was tombstoned.
    pub fn release_cell(&mut self, id: CellId, coord: Coord) -> StoreResult<bool> {
        self.cells.release(id, coord)
    }

    /// Coordinates currently referencing a cell identity.
    pub fn cell_locations(&self, id: CellId) -> StoreResult<&BTreeSet<Coord>> {
        Ok(&self.cells.get(id)?.locations)
    }

    /// Live cell count.
    pub fn cell_count(&self) -> usize {
        self.cells.live_len()
    }

    /// Iterate over live cells in identity order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().map(|(id, slot)| (id, &slot.value))
    }

    /// The cell slot, for collaborators that need hash and locations
    /// together.
    pub fn cell_slot(&self, id: CellId) -> StoreResult<&Slot<Cell>> {
        self.cells.get(id)
    }

    // ---------------------------------------------------------------
    // Cell contents
    // ---------------------------------------------------------------

    /// Detached copies of a cell's members, in cell order.
    ///
    /// A coordinate may reference a cell whose member was released without
    /// the cell being repaired; such holes are skipped and logged, never a
    /// crash.
    pub fn contents(&self, cell: &Cell) -> Vec<ObjectInstance> {
        let mut out = Vec::with_capacity(cell.len());
        for &member in cell.members() {
            match self.fetch_object(member) {
                Ok(instance) => out.push(instance),
                Err(_) => {
                    warn!(instance = %member, "cell references unknown instance, skipping");
                }
            }
        }
        out
    }

    /// Cell contents sorted by descending draw order (layer). Ties keep
    /// cell order.
    pub fn ordered_contents(&self, cell: &Cell) -> Vec<ObjectInstance> {
        let mut out = self.contents(cell);
        out.sort_by(|a, b| b.draw_order().total_cmp(&a.draw_order()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::instance::SetFlags;
    use gridmap_types::{TypePath, Value};

    fn instance(path: &str) -> ObjectInstance {
        ObjectInstance::new(TypePath::parse(path).unwrap())
    }

    fn at(x: u32, y: u32, z: u32) -> Option<Coord> {
        Some(Coord::new(x, y, z))
    }

    // ----------------------------------------------------------
    // Object interning
    // ----------------------------------------------------------

    #[test]
    fn interning_twice_is_idempotent() {
        let mut store = Store::new();
        let mut a = instance("/turf/wall");
        let mut b = instance("/turf/wall");
        let first = store.intern_object(&mut a, None).unwrap();
        let second = store.intern_object(&mut b, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.object_count(), 1);
        assert_eq!(a.id, Some(first));
        assert_eq!(b.id, Some(first));
    }

    #[test]
    fn dedup_is_creation_order_independent() {
        let mut store = Store::new();
        let mut a = instance("/obj/lamp");
        a.set("dir", Value::number(4.0), SetFlags::default());
        a.set("name", Value::Str("lamp".into()), SetFlags::default());
        let mut b = instance("/obj/lamp");
        b.set("name", Value::Str("lamp".into()), SetFlags::default());
        b.set("dir", Value::number(4.0), SetFlags::default());

        let first = store.intern_object(&mut a, None).unwrap();
        let second = store.intern_object(&mut b, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fetch_serializes_equal_to_the_original() {
        let mut store = Store::new();
        let mut original = instance("/obj/sign");
        original.set("text", Value::Str("exit".into()), SetFlags::default());
        let id = store.intern_object(&mut original, None).unwrap();
        let fetched = store.fetch_object(id).unwrap();
        assert_eq!(
            fetched.canonical_serialize(),
            original.canonical_serialize()
        );
        assert_eq!(fetched.id, Some(id));
    }

    #[test]
    fn mutating_a_fetched_copy_does_not_leak_back() {
        let mut store = Store::new();
        let id = store.intern_object(&mut instance("/obj/crate"), None).unwrap();
        let mut copy = store.fetch_object(id).unwrap();
        copy.set("opened", Value::number(1.0), SetFlags::default());
        let again = store.fetch_object(id).unwrap();
        assert_eq!(again.canonical_serialize(), "/obj/crate{}");
    }

    #[test]
    fn fetch_of_unknown_identity_fails() {
        let store = Store::new();
        let bogus = InstanceId::new(3);
        assert_eq!(
            store.fetch_object(bogus),
            Err(StoreError::UnknownInstance(bogus))
        );
    }

    // ----------------------------------------------------------
    // Reference counting
    // ----------------------------------------------------------

    #[test]
    fn three_placements_then_three_releases_tombstone() {
        let mut store = Store::new();
        let mut wall = instance("/turf/wall");
        let id = store.intern_object(&mut wall, at(0, 0, 0)).unwrap();
        store.intern_object(&mut wall, at(1, 0, 0)).unwrap();
        store.intern_object(&mut wall, at(2, 0, 0)).unwrap();
        assert_eq!(store.object_locations(id).unwrap().len(), 3);

        assert!(!store.release_object(id, Coord::new(0, 0, 0)).unwrap());
        assert!(!store.release_object(id, Coord::new(1, 0, 0)).unwrap());
        assert!(store.release_object(id, Coord::new(2, 0, 0)).unwrap());

        assert_eq!(store.fetch_object(id), Err(StoreError::UnknownInstance(id)));

        // Equal content re-interned later gets a fresh identity.
        let fresh = store.intern_object(&mut instance("/turf/wall"), None).unwrap();
        assert_ne!(fresh, id);
    }

    // ----------------------------------------------------------
    // Cells
    // ----------------------------------------------------------

    #[test]
    fn cell_canonical_joins_member_serializations() {
        let mut store = Store::new();
        let floor = store.intern_object(&mut instance("/turf/floor"), None).unwrap();
        let lamp = store.intern_object(&mut instance("/obj/lamp"), None).unwrap();
        let mut cell = Cell::new();
        cell.append(floor);
        cell.append(lamp);
        assert_eq!(store.cell_canonical(&cell), "/turf/floor{},/obj/lamp{}");
    }

    #[test]
    fn equal_cells_share_one_identity() {
        let mut store = Store::new();
        let floor = store.intern_object(&mut instance("/turf/floor"), None).unwrap();
        let mut a = Cell::new();
        a.append(floor);
        let mut b = Cell::new();
        b.append(floor);
        let first = store.intern_cell(&mut a, at(0, 0, 0)).unwrap();
        let second = store.intern_cell(&mut b, at(5, 5, 0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.cell_count(), 1);
        assert_eq!(store.cell_locations(first).unwrap().len(), 2);
    }

    #[test]
    fn contents_skips_released_members() {
        let mut store = Store::new();
        let floor = store
            .intern_object(&mut instance("/turf/floor"), at(0, 0, 0))
            .unwrap();
        let lamp = store
            .intern_object(&mut instance("/obj/lamp"), at(0, 0, 0))
            .unwrap();
        let mut cell = Cell::new();
        cell.append(floor);
        cell.append(lamp);
        store.intern_cell(&mut cell, at(0, 0, 0)).unwrap();

        // Release the lamp without repairing the cell.
        store.release_object(lamp, Coord::new(0, 0, 0)).unwrap();

        let contents = store.contents(&cell);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].path.as_str(), "/turf/floor");
    }

    #[test]
    fn ordered_contents_sorts_by_descending_layer() {
        let mut store = Store::new();
        let mut cell = Cell::new();
        for (path, layer) in [("/a/one", 1.0), ("/a/three", 3.0), ("/a/two", 2.0)] {
            let mut obj = instance(path);
            obj.set("layer", Value::number(layer), SetFlags::default());
            let id = store.intern_object(&mut obj, None).unwrap();
            cell.append(id);
        }
        let ordered = store.ordered_contents(&cell);
        let layers: Vec<f64> = ordered.iter().map(ObjectInstance::draw_order).collect();
        assert_eq!(layers, [3.0, 2.0, 1.0]);
    }

    #[test]
    fn non_numeric_layer_sorts_as_zero_without_panicking() {
        let mut store = Store::new();
        let mut cell = Cell::new();
        let mut top = instance("/a/top");
        top.set("layer", Value::number(5.0), SetFlags::default());
        let mut odd = instance("/a/odd");
        odd.set("layer", Value::Str("fish".into()), SetFlags::default());
        cell.append(store.intern_object(&mut top, None).unwrap());
        cell.append(store.intern_object(&mut odd, None).unwrap());

        let ordered = store.ordered_contents(&cell);
        assert_eq!(ordered[0].path.as_str(), "/a/top");
        assert_eq!(ordered[1].draw_order(), 0.0);
    }

    // ----------------------------------------------------------
    // Serialization
    // ----------------------------------------------------------

    #[test]
    fn serde_roundtrip_preserves_canonical_tables() {
        let mut store = Store::new();
        let id = store
            .intern_object(&mut instance("/turf/wall"), at(1, 0, 0))
            .unwrap();
        let mut cell = Cell::new();
        cell.append(id);
        let cell_id = store.intern_cell(&mut cell, at(1, 0, 0)).unwrap();

        let json = serde_json::to_string(&store).unwrap();
        let mut parsed: Store = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.fetch_object(id).unwrap(),
            store.fetch_object(id).unwrap()
        );
        assert_eq!(
            parsed.fetch_cell(cell_id).unwrap(),
            store.fetch_cell(cell_id).unwrap()
        );
        // The restored hash index still dedups equal content.
        assert_eq!(
            parsed.intern_object(&mut instance("/turf/wall"), None).unwrap(),
            id
        );
    }

    // ----------------------------------------------------------
    // Iteration
    // ----------------------------------------------------------

    #[test]
    fn objects_and_cells_iterate_live_entries() {
        let mut store = Store::new();
        let a = store
            .intern_object(&mut instance("/a"), at(0, 0, 0))
            .unwrap();
        let b = store.intern_object(&mut instance("/b"), None).unwrap();
        store.release_object(a, Coord::new(0, 0, 0)).unwrap();

        let ids: Vec<InstanceId> = store.objects().map(|(id, _)| id).collect();
        assert_eq!(ids, [b]);
        assert_eq!(store.cells().count(), 0);
    }
}
