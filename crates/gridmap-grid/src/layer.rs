use ndarray::Array2;
use serde::{Deserialize, Serialize};

use gridmap_types::{CellId, Coord};

use crate::error::{GridError, GridResult};

/// One elevation's dense 2D array of cell identities.
///
/// Every slot always holds an identity — new slots are filled with the
/// grid's designated empty-cell identity, never left unset. The array is
/// indexed `[row, column]`, i.e. `[y, x]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    z: u32,
    tiles: Array2<CellId>,
}

impl Layer {
    /// A `width` × `height` layer with every slot set to `fill`.
    pub fn new(width: u32, height: u32, z: u32, fill: CellId) -> Self {
        Self {
            z,
            tiles: Array2::from_elem((height as usize, width as usize), fill),
        }
    }

    pub fn z(&self) -> u32 {
        self.z
    }

    pub fn width(&self) -> u32 {
        self.tiles.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.tiles.nrows() as u32
    }

    /// The cell identity at a coordinate.
    pub fn get(&self, x: u32, y: u32) -> GridResult<CellId> {
        self.tiles
            .get((y as usize, x as usize))
            .copied()
            .ok_or(GridError::OutOfBounds(Coord::new(x, y, self.z)))
    }

    /// Write a cell identity at a coordinate. The array stores identities
    /// only; interning the cell is the caller's job.
    pub fn set(&mut self, x: u32, y: u32, id: CellId) -> GridResult<()> {
        let slot = self
            .tiles
            .get_mut((y as usize, x as usize))
            .ok_or(GridError::OutOfBounds(Coord::new(x, y, self.z)))?;
        *slot = id;
        Ok(())
    }

    /// Grow the layer to at least `width` × `height`, filling new slots with
    /// `fill`. Existing content is kept; dimensions never shrink. Returns
    /// the coordinates of every newly created slot so the caller can
    /// register them against the empty cell.
    pub fn resize(&mut self, width: u32, height: u32, fill: CellId) -> Vec<Coord> {
        let new_width = width.max(self.width());
        let new_height = height.max(self.height());
        if new_width == self.width() && new_height == self.height() {
            return Vec::new();
        }

        let old = std::mem::replace(
            &mut self.tiles,
            Array2::from_elem((new_height as usize, new_width as usize), fill),
        );
        let mut created = Vec::new();
        for y in 0..new_height {
            for x in 0..new_width {
                match old.get((y as usize, x as usize)) {
                    Some(&id) => self.tiles[(y as usize, x as usize)] = id,
                    None => created.push(Coord::new(x, y, self.z)),
                }
            }
        }
        created
    }
}
