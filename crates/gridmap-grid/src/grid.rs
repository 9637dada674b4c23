use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gridmap_proto::{draw_order_value, PrototypeArena, LAYER_PROPERTY};
use gridmap_store::{Cell, ObjectInstance, Store};
use gridmap_types::{CellId, Coord, InstanceId, TypePath, Value};

use crate::error::{GridError, GridResult};
use crate::iter::CoordIter;
use crate::layer::Layer;

/// The aggregate: ordered layers, the canonical store they index into, and
/// an optional prototype tree for path resolution.
///
/// `Grid` is single-writer and synchronous; every operation runs to
/// completion, and all canonical-table mutation flows through the store's
/// `intern_*` / `release_*`. Values returned to callers are detached copies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid {
    layers: Vec<Layer>,
    store: Store,
    tree: Option<PrototypeArena>,
    /// Synthesize placeholders for placement paths the tree no longer
    /// defines, instead of failing the load.
    forgiving: bool,
    /// Paths synthesized while forgiving, for later reporting.
    missing_paths: BTreeSet<TypePath>,
    /// Identity of the canonical empty cell, used to fill new layer slots.
    empty_cell: CellId,
}

impl Grid {
    /// An empty grid with no layers and no prototype tree.
    pub fn new() -> Self {
        let mut store = Store::new();
        let mut empty = Cell::new();
        // A fresh store has nothing to corrupt.
        let empty_cell = store
            .intern_cell(&mut empty, None)
            .expect("interning into a fresh store cannot fail");
        Self {
            layers: Vec::new(),
            store,
            tree: None,
            forgiving: false,
            missing_paths: BTreeSet::new(),
            empty_cell,
        }
    }

    /// An empty grid resolving placement paths against `tree`.
    pub fn with_tree(tree: PrototypeArena) -> Self {
        let mut grid = Self::new();
        grid.tree = Some(tree);
        grid
    }

    /// Toggle forgiving prototype lookups (builder style).
    pub fn forgiving(mut self, forgiving: bool) -> Self {
        self.forgiving = forgiving;
        self
    }

    /// Attach or replace the prototype tree.
    pub fn load_tree(&mut self, tree: PrototypeArena) {
        self.tree = Some(tree);
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tree(&self) -> Option<&PrototypeArena> {
        self.tree.as_ref()
    }

    /// Identity of the canonical empty cell.
    pub fn empty_cell(&self) -> CellId {
        self.empty_cell
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, z: u32) -> GridResult<&Layer> {
        self.layers
            .get(z as usize)
            .ok_or(GridError::UnknownLayer(z))
    }

    fn layer_mut(&mut self, z: u32) -> GridResult<&mut Layer> {
        self.layers
            .get_mut(z as usize)
            .ok_or(GridError::UnknownLayer(z))
    }

    /// Paths synthesized as placeholders while forgiving.
    pub fn missing_paths(&self) -> &BTreeSet<TypePath> {
        &self.missing_paths
    }

    // ---------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------

    /// Create a `width` × `height` layer filled with the empty cell.
    ///
    /// With `z = None` the layer is appended at the next elevation; with
    /// `z = Some(existing)` it replaces that elevation (releasing the old
    /// layer's coordinate claims first). Returns the elevation.
    pub fn create_layer(&mut self, width: u32, height: u32, z: Option<u32>) -> GridResult<u32> {
        let z = match z {
            None => self.layers.len() as u32,
            Some(z) if (z as usize) <= self.layers.len() => z,
            Some(z) => return Err(GridError::UnknownLayer(z)),
        };

        if (z as usize) < self.layers.len() {
            self.release_layer_claims(z)?;
        }

        let fill = self.ensure_empty_cell()?;
        let layer = Layer::new(width, height, z, fill);
        if (z as usize) < self.layers.len() {
            self.layers[z as usize] = layer;
        } else {
            self.layers.push(layer);
        }

        for y in 0..height {
            for x in 0..width {
                self.claim_empty(Coord::new(x, y, z))?;
            }
        }
        debug!(z, width, height, "created layer");
        Ok(z)
    }

    /// Grow a layer to at least `width` × `height`; new slots hold the
    /// empty cell.
    pub fn resize_layer(&mut self, z: u32, width: u32, height: u32) -> GridResult<()> {
        let empty = self.ensure_empty_cell()?;
        let created = self.layer_mut(z)?.resize(width, height, empty);
        for coord in created {
            self.claim_empty(coord)?;
        }
        Ok(())
    }

    /// Register a coordinate against the canonical empty cell. Goes through
    /// the ordinary intern path so reference counts stay uniform.
    fn claim_empty(&mut self, coord: Coord) -> GridResult<()> {
        self.store.intern_cell(&mut Cell::new(), Some(coord))?;
        Ok(())
    }

    /// Re-intern the empty cell and refresh its cached identity. The cached
    /// identity goes stale if every coordinate holding the empty cell is
    /// overwritten (the slot gets tombstoned once its last claim drops).
    fn ensure_empty_cell(&mut self) -> GridResult<CellId> {
        self.empty_cell = self.store.intern_cell(&mut Cell::new(), None)?;
        Ok(self.empty_cell)
    }

    /// Release every coordinate claim a layer holds (used when replacing an
    /// elevation).
    fn release_layer_claims(&mut self, z: u32) -> GridResult<()> {
        let layer = self.layer(z)?;
        let mut claims = Vec::new();
        for y in 0..layer.height() {
            for x in 0..layer.width() {
                claims.push((layer.get(x, y)?, Coord::new(x, y, z)));
            }
        }
        for (id, coord) in claims {
            self.store.release_cell(id, coord)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Cells
    // ---------------------------------------------------------------

    /// The cell identity stored at a coordinate.
    pub fn cell_id_at(&self, x: u32, y: u32, z: u32) -> GridResult<CellId> {
        self.layer(z)?.get(x, y)
    }

    /// A detached copy of the cell at a coordinate.
    pub fn get_cell_at(&self, x: u32, y: u32, z: u32) -> GridResult<Cell> {
        let id = self.cell_id_at(x, y, z)?;
        Ok(self.store.fetch_cell(id)?)
    }

    /// Intern `cell` and store its identity at the coordinate, releasing
    /// the coordinate's previous claim. Returns the interned identity.
    pub fn set_cell_at(&mut self, x: u32, y: u32, z: u32, cell: &Cell) -> GridResult<CellId> {
        let coord = Coord::new(x, y, z);
        let old = self.cell_id_at(x, y, z)?;
        let mut copy = cell.clone();
        let new = self.store.intern_cell(&mut copy, Some(coord))?;
        self.layer_mut(z)?.set(x, y, new)?;
        if old != new {
            self.store.release_cell(old, coord)?;
        }
        Ok(new)
    }

    // ---------------------------------------------------------------
    // Object placement
    // ---------------------------------------------------------------

    /// Place an object at a coordinate: intern the instance, append its
    /// identity to the coordinate's cell, and re-intern the cell.
    pub fn place_object_at(
        &mut self,
        x: u32,
        y: u32,
        z: u32,
        instance: &ObjectInstance,
    ) -> GridResult<(InstanceId, CellId)> {
        let coord = Coord::new(x, y, z);
        let mut cell = self.get_cell_at(x, y, z)?;
        let mut copy = instance.clone();
        let instance_id = self.store.intern_object(&mut copy, Some(coord))?;
        cell.append(instance_id);
        let cell_id = self.set_cell_at(x, y, z, &cell)?;
        Ok((instance_id, cell_id))
    }

    /// Remove one occurrence of an object from a coordinate's cell and
    /// release the coordinate's claim on it. Returns `false` if the cell
    /// did not contain it.
    pub fn remove_object_at(
        &mut self,
        x: u32,
        y: u32,
        z: u32,
        instance: InstanceId,
    ) -> GridResult<bool> {
        let coord = Coord::new(x, y, z);
        let mut cell = self.get_cell_at(x, y, z)?;
        if !cell.remove(instance) {
            return Ok(false);
        }
        self.set_cell_at(x, y, z, &cell)?;
        self.store.release_object(instance, coord)?;
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Path resolution
    // ---------------------------------------------------------------

    /// Resolve a placement path into a fresh [`ObjectInstance`].
    ///
    /// With a prototype tree attached, an unknown path is a hard failure —
    /// unless the grid is forgiving, in which case a placeholder marked
    /// `missing` is synthesized and the path recorded for reporting.
    /// Without a tree, instances are synthesized unconditionally so a grid
    /// can be read without compiling its definitions.
    pub fn resolve(&mut self, path: &TypePath) -> GridResult<ObjectInstance> {
        let Some(tree) = self.tree.as_ref() else {
            return Ok(ObjectInstance::new(path.clone()));
        };
        if tree.lookup(path).is_some() {
            return Ok(ObjectInstance::new(path.clone()));
        }
        if self.forgiving {
            warn!(%path, "prototype missing, synthesizing placeholder");
            self.missing_paths.insert(path.clone());
            return Ok(ObjectInstance::placeholder(path.clone()));
        }
        Err(GridError::UnknownPrototype(path.clone()))
    }

    /// An instance property resolved through the prototype tree: the
    /// placement override if present, otherwise the (inherited) prototype
    /// value.
    pub fn resolved_property(&self, instance: &ObjectInstance, name: &str) -> Option<Value> {
        if let Some(value) = instance.get(name) {
            return Some(value.clone());
        }
        let tree = self.tree.as_ref()?;
        let id = tree.lookup(&instance.path)?;
        tree.get(id).ok()?.get(name).cloned()
    }

    // ---------------------------------------------------------------
    // Iteration and contents
    // ---------------------------------------------------------------

    /// Iterate over every coordinate (x innermost, then y, then elevation)
    /// with the cell identity stored there.
    pub fn coords(&self) -> CoordIter<'_> {
        CoordIter::new(self)
    }

    /// Iterate over live canonical instances in identity order.
    pub fn objects(&self) -> impl Iterator<Item = (InstanceId, &ObjectInstance)> {
        self.store.objects()
    }

    /// Iterate over live canonical cells in identity order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.store.cells()
    }

    /// Detached copies of a coordinate's cell members.
    pub fn contents_at(&self, x: u32, y: u32, z: u32) -> GridResult<Vec<ObjectInstance>> {
        let cell = self.get_cell_at(x, y, z)?;
        Ok(self.store.contents(&cell))
    }

    /// A coordinate's cell members sorted by descending draw order, with
    /// layer values resolved through the prototype tree.
    pub fn ordered_contents_at(&self, x: u32, y: u32, z: u32) -> GridResult<Vec<ObjectInstance>> {
        let mut contents = self.contents_at(x, y, z)?;
        contents.sort_by(|a, b| {
            self.resolved_draw_order(b)
                .total_cmp(&self.resolved_draw_order(a))
        });
        Ok(contents)
    }

    fn resolved_draw_order(&self, instance: &ObjectInstance) -> f64 {
        self.resolved_property(instance, LAYER_PROPERTY)
            .map_or(0.0, |value| draw_order_value(&value))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
