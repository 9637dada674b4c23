use gridmap_types::{CellId, Coord};

use crate::grid::Grid;

/// Flat iteration over every grid coordinate: x innermost, then y, then
/// elevation. Layers may differ in size; each is walked over its own
/// dimensions.
pub struct CoordIter<'a> {
    grid: &'a Grid,
    x: u32,
    y: u32,
    z: u32,
}

impl<'a> CoordIter<'a> {
    pub(crate) fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            x: 0,
            y: 0,
            z: 0,
        }
    }
}

impl Iterator for CoordIter<'_> {
    type Item = (Coord, CellId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let layer = match self.grid.layer(self.z) {
                Ok(layer) => layer,
                Err(_) => return None, // past the last elevation
            };
            if self.y >= layer.height() || self.x >= layer.width() {
                if self.x >= layer.width() && self.y + 1 < layer.height() {
                    self.x = 0;
                    self.y += 1;
                } else {
                    self.x = 0;
                    self.y = 0;
                    self.z += 1;
                }
                continue;
            }
            let coord = Coord::new(self.x, self.y, self.z);
            let id = layer.get(self.x, self.y).ok()?;
            self.x += 1;
            return Some((coord, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_x_then_y_then_z() {
        let mut grid = Grid::new();
        grid.create_layer(2, 2, None).unwrap();
        grid.create_layer(1, 1, None).unwrap();

        let coords: Vec<Coord> = grid.coords().map(|(coord, _)| coord).collect();
        assert_eq!(
            coords,
            [
                Coord::new(0, 0, 0),
                Coord::new(1, 0, 0),
                Coord::new(0, 1, 0),
                Coord::new(1, 1, 0),
                Coord::new(0, 0, 1),
            ]
        );
    }

    #[test]
    fn empty_grid_yields_nothing() {
        let grid = Grid::new();
        assert_eq!(grid.coords().count(), 0);
    }

    #[test]
    fn zero_sized_layers_are_skipped() {
        let mut grid = Grid::new();
        grid.create_layer(0, 3, None).unwrap();
        grid.create_layer(1, 1, None).unwrap();
        let coords: Vec<Coord> = grid.coords().map(|(coord, _)| coord).collect();
        assert_eq!(coords, [Coord::new(0, 0, 1)]);
    }

    #[test]
    fn yields_the_stored_identity() {
        let mut grid = Grid::new();
        grid.create_layer(2, 1, None).unwrap();
        let empty = grid.empty_cell();
        for (_, id) in grid.coords() {
            assert_eq!(id, empty);
        }
    }
}
