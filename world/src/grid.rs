//! Spatial grid that owns the valid-cell set and the occupant of every cell.

use std::collections::{BTreeMap, BTreeSet};

use beatgrid_core::{ActorHandle, CellCoord, GridLayout};
use glam::Vec2;

const FALLBACK_CELL_SIZE: f32 = 1.0;

/// Longest side a rectangle layout may have; larger requests are clamped.
pub const MAX_RECTANGLE_SIDE: u32 = 1024;

/// Valid cells plus the actor registered on each of them.
///
/// The grid enforces one structural invariant: every occupied cell is a valid
/// cell. Whether an occupant may be overwritten is a caller policy; the
/// world only ever claims cells it has checked to be free.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    valid: BTreeSet<CellCoord>,
    occupants: BTreeMap<CellCoord, ActorHandle>,
    cell_size: f32,
    origin: Vec2,
}

impl SpatialGrid {
    /// Creates an empty grid using the provided world-space cell size and origin.
    ///
    /// Non-finite or non-positive cell sizes fall back to one world unit.
    #[must_use]
    pub fn new(cell_size: f32, origin: Vec2) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            FALLBACK_CELL_SIZE
        };
        Self {
            valid: BTreeSet::new(),
            occupants: BTreeMap::new(),
            cell_size,
            origin,
        }
    }

    /// Clears the grid and repopulates the valid cells from `layout`.
    ///
    /// Occupants are never carried across a rebuild. Rectangle sides are
    /// clamped to [`MAX_RECTANGLE_SIDE`].
    pub fn rebuild(&mut self, layout: &GridLayout) {
        self.valid.clear();
        self.occupants.clear();

        match layout {
            GridLayout::Rectangle { width, height } => {
                let width = side(*width);
                let height = side(*height);
                for y in 0..height {
                    for x in 0..width {
                        let _ = self.valid.insert(CellCoord::new(x, y));
                    }
                }
            }
            GridLayout::Mask { cells } => {
                self.valid.extend(cells.iter().copied());
            }
        }
    }

    /// Reports whether the cell belongs to the grid.
    #[must_use]
    pub fn is_valid(&self, cell: CellCoord) -> bool {
        self.valid.contains(&cell)
    }

    /// Returns the actor registered at `cell`, or `None` for empty or invalid cells.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<ActorHandle> {
        self.occupants.get(&cell).copied()
    }

    /// Registers `actor` at `cell`, or clears the cell when `actor` is `None`.
    ///
    /// Invalid cells are ignored.
    pub fn set_occupant(&mut self, cell: CellCoord, actor: Option<ActorHandle>) {
        if !self.is_valid(cell) {
            return;
        }

        match actor {
            Some(handle) => {
                let _ = self.occupants.insert(cell, handle);
            }
            None => {
                let _ = self.occupants.remove(&cell);
            }
        }
    }

    /// Removes whatever is registered at `cell`.
    pub fn clear_occupant(&mut self, cell: CellCoord) {
        let _ = self.occupants.remove(&cell);
    }

    /// Iterates over every valid cell in a stable order.
    pub fn valid_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.valid.iter().copied()
    }

    /// Iterates over occupied cells and their occupants in a stable order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, ActorHandle)> + '_ {
        self.occupants.iter().map(|(cell, handle)| (*cell, *handle))
    }

    /// Number of valid cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    /// Reports whether the grid has no valid cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Smallest rectangle enclosing every valid cell, as inclusive corners.
    #[must_use]
    pub fn bounds(&self) -> Option<(CellCoord, CellCoord)> {
        let first = *self.valid.iter().next()?;
        let (min, max) = self.valid.iter().fold((first, first), |(min, max), cell| {
            (
                CellCoord::new(min.x().min(cell.x()), min.y().min(cell.y())),
                CellCoord::new(max.x().max(cell.x()), max.y().max(cell.y())),
            )
        });
        Some((min, max))
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space position of the centre of `cell`.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin + Vec2::new(cell.x() as f32, cell.y() as f32) * self.cell_size
    }

    /// Cell whose centre is nearest to `position`.
    #[must_use]
    pub fn world_to_cell(&self, position: Vec2) -> CellCoord {
        let local = ((position - self.origin) / self.cell_size).round();
        CellCoord::new(local.x as i32, local.y as i32)
    }
}

fn side(length: u32) -> i32 {
    // MAX_RECTANGLE_SIDE always fits in an i32.
    i32::try_from(length.min(MAX_RECTANGLE_SIDE)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatgrid_core::{ActorId, ActorKind};

    fn rectangle(width: u32, height: u32) -> SpatialGrid {
        let mut grid = SpatialGrid::new(1.0, Vec2::ZERO);
        grid.rebuild(&GridLayout::Rectangle { width, height });
        grid
    }

    fn handle(value: u32) -> ActorHandle {
        ActorHandle::new(ActorId::new(value), ActorKind::PushableBox)
    }

    #[test]
    fn oversized_rectangles_are_clamped() {
        let grid = rectangle(u32::MAX, 2);
        assert_eq!(grid.len(), MAX_RECTANGLE_SIDE as usize * 2);
        let last = MAX_RECTANGLE_SIDE as i32 - 1;
        assert!(grid.is_valid(CellCoord::new(last, 1)));
        assert!(!grid.is_valid(CellCoord::new(last + 1, 1)));
    }

    #[test]
    fn rectangle_marks_every_cell_valid() {
        let grid = rectangle(4, 3);
        assert_eq!(grid.len(), 12);
        assert!(grid.is_valid(CellCoord::new(0, 0)));
        assert!(grid.is_valid(CellCoord::new(3, 2)));
        assert!(!grid.is_valid(CellCoord::new(4, 0)));
        assert!(!grid.is_valid(CellCoord::new(-1, 0)));
    }

    #[test]
    fn mask_ignores_duplicate_cells() {
        let mut grid = SpatialGrid::new(1.0, Vec2::ZERO);
        grid.rebuild(&GridLayout::Mask {
            cells: vec![
                CellCoord::new(2, 2),
                CellCoord::new(-3, 1),
                CellCoord::new(2, 2),
            ],
        });
        assert_eq!(grid.len(), 2);
        assert!(grid.is_valid(CellCoord::new(-3, 1)));
    }

    #[test]
    fn occupant_of_invalid_cell_is_none() {
        let grid = rectangle(2, 2);
        assert_eq!(grid.occupant(CellCoord::new(10, 10)), None);
    }

    #[test]
    fn set_occupant_ignores_invalid_cells() {
        let mut grid = rectangle(2, 2);
        grid.set_occupant(CellCoord::new(5, 5), Some(handle(1)));
        assert_eq!(grid.occupied_cells().count(), 0);
    }

    #[test]
    fn set_occupant_none_clears_the_cell() {
        let mut grid = rectangle(2, 2);
        let cell = CellCoord::new(1, 1);
        grid.set_occupant(cell, Some(handle(1)));
        assert_eq!(grid.occupant(cell), Some(handle(1)));
        grid.set_occupant(cell, None);
        assert_eq!(grid.occupant(cell), None);
    }

    #[test]
    fn clear_occupant_on_empty_cell_is_a_no_op() {
        let mut grid = rectangle(2, 2);
        grid.clear_occupant(CellCoord::new(0, 0));
        grid.clear_occupant(CellCoord::new(9, 9));
        assert_eq!(grid.occupied_cells().count(), 0);
    }

    #[test]
    fn rebuild_discards_occupants() {
        let mut grid = rectangle(3, 3);
        grid.set_occupant(CellCoord::new(1, 1), Some(handle(4)));
        grid.rebuild(&GridLayout::Rectangle {
            width: 3,
            height: 3,
        });
        assert_eq!(grid.occupant(CellCoord::new(1, 1)), None);
    }

    #[test]
    fn valid_cells_are_restartable_and_stable() {
        let grid = rectangle(3, 2);
        let first: Vec<_> = grid.valid_cells().collect();
        let second: Vec<_> = grid.valid_cells().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn world_coordinates_round_trip_through_cells() {
        let grid = SpatialGrid::new(2.0, Vec2::new(10.0, -4.0));
        let cell = CellCoord::new(3, -2);
        let centre = grid.cell_to_world(cell);
        assert_eq!(centre, Vec2::new(16.0, -8.0));
        assert_eq!(grid.world_to_cell(centre), cell);
        assert_eq!(grid.world_to_cell(centre + Vec2::new(0.9, -0.9)), cell);
    }

    #[test]
    fn invalid_cell_size_falls_back_to_unit_cells() {
        assert_eq!(SpatialGrid::new(0.0, Vec2::ZERO).cell_size(), 1.0);
        assert_eq!(SpatialGrid::new(f32::NAN, Vec2::ZERO).cell_size(), 1.0);
    }

    #[test]
    fn bounds_enclose_mask_cells() {
        let mut grid = SpatialGrid::new(1.0, Vec2::ZERO);
        assert_eq!(grid.bounds(), None);
        grid.rebuild(&GridLayout::Mask {
            cells: vec![CellCoord::new(-2, 5), CellCoord::new(4, -1)],
        });
        assert_eq!(
            grid.bounds(),
            Some((CellCoord::new(-2, -1), CellCoord::new(4, 5)))
        );
    }
}
