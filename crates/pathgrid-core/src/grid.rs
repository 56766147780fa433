//! Navigation grid: walkability, movement cost and region labels per cell.
//!
//! The grid is at most [`MAX_GRID_WIDTH`] × [`MAX_GRID_HEIGHT`] cells.
//! World coordinates map to cells by floor division with `cell_size`;
//! cells map back to their centre, so a round trip always lands on the
//! same cell.
//!
//! ```
//! use pathgrid_core::grid::{GridPos, NavGrid};
//!
//! let mut grid = NavGrid::with_dimensions(10, 10, 2.0).unwrap();
//! grid.set_walkable(3, 3, false);
//! assert!(!grid.is_walkable(3, 3));
//!
//! let centre = grid.grid_to_world(GridPos::new(4, 7));
//! assert_eq!((centre.x, centre.y), (9.0, 15.0));
//! assert_eq!(grid.world_to_grid(centre.x, centre.y), GridPos::new(4, 7));
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::math::Vec2;

pub const MAX_GRID_WIDTH: u32 = 256;
pub const MAX_GRID_HEIGHT: u32 = 256;
pub const DEFAULT_CELL_SIZE: f32 = 2.0;

/// The 8 neighbour offsets in scan order (row by row, left to right).
pub(crate) const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Per-cell navigation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub walkable: bool,
    /// Movement cost multiplier, 1..=255.
    pub cost: u8,
    /// Connected-component label; 0 = unlabelled or blocked.
    pub region_id: u16,
}

impl Default for GridCell {
    fn default() -> Self {
        Self {
            walkable: true,
            cost: 1,
            region_id: 0,
        }
    }
}

/// Integer cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in cells.
    pub fn distance(&self, other: &GridPos) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone)]
pub struct NavGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    cells: Vec<GridCell>,
    regions_fresh: bool,
    region_count: u16,
}

impl Default for NavGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl NavGrid {
    /// Full-size grid, every cell walkable with cost 1.
    pub fn new() -> Self {
        let width = MAX_GRID_WIDTH;
        let height = MAX_GRID_HEIGHT;
        Self {
            width,
            height,
            cell_size: DEFAULT_CELL_SIZE,
            cells: vec![GridCell::default(); (width * height) as usize],
            regions_fresh: false,
            region_count: 0,
        }
    }

    pub fn with_dimensions(width: u32, height: u32, cell_size: f32) -> NavResult<Self> {
        let mut grid = Self::new();
        grid.set_dimensions(width, height, cell_size)?;
        Ok(grid)
    }

    /// Rebuild a grid from stored cells (see [`crate::persistence`]).
    pub fn from_cells(
        width: u32,
        height: u32,
        cell_size: f32,
        cells: Vec<GridCell>,
    ) -> NavResult<Self> {
        let mut grid = Self::with_dimensions(width, height, cell_size)?;
        if cells.len() != grid.cells.len() {
            return Err(NavError::Config(format!(
                "expected {} cells for a {}x{} grid, found {}",
                grid.cells.len(),
                grid.width,
                grid.height,
                cells.len()
            )));
        }
        grid.cells = cells;
        for cell in &mut grid.cells {
            cell.cost = cell.cost.max(1);
            cell.region_id = 0;
        }
        Ok(grid)
    }

    /// Resize the grid. Dimensions are clamped to `1..=MAX`; every cell is
    /// reset to the default when the size changes.
    pub fn set_dimensions(&mut self, width: u32, height: u32, cell_size: f32) -> NavResult<()> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(NavError::InvalidCellSize(cell_size));
        }
        let width = width.clamp(1, MAX_GRID_WIDTH);
        let height = height.clamp(1, MAX_GRID_HEIGHT);

        if width != self.width || height != self.height {
            self.cells = vec![GridCell::default(); (width * height) as usize];
            self.regions_fresh = false;
            self.region_count = 0;
        }
        self.width = width;
        self.height = height;
        self.cell_size = cell_size;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&GridCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Returns `false` (and does nothing) for out-of-range cells.
    pub fn set_walkable(&mut self, x: u32, y: u32, walkable: bool) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        if self.cells[i].walkable != walkable {
            self.cells[i].walkable = walkable;
            self.regions_fresh = false;
        }
        true
    }

    /// Returns `false` (and does nothing) for out-of-range cells.
    /// A cost of 0 is stored as 1.
    pub fn set_cost(&mut self, x: u32, y: u32, cost: u8) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        self.cells[i].cost = cost.max(1);
        true
    }

    /// Mark every cell of an inclusive rectangle (clipped to the grid).
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, walkable: bool) {
        let (lo_x, hi_x) = (x0.min(x1), x0.max(x1).min(self.width - 1));
        let (lo_y, hi_y) = (y0.min(y1), y0.max(y1).min(self.height - 1));
        for y in lo_y..=hi_y {
            for x in lo_x..=hi_x {
                self.set_walkable(x, y, walkable);
            }
        }
    }

    pub fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.cell(x, y).map(|c| c.walkable).unwrap_or(false)
    }

    /// Out-of-range cells report the maximum cost.
    pub fn cost(&self, x: u32, y: u32) -> u8 {
        self.cell(x, y).map(|c| c.cost).unwrap_or(u8::MAX)
    }

    pub fn region_id(&self, x: u32, y: u32) -> u16 {
        self.cell(x, y).map(|c| c.region_id).unwrap_or(0)
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.walkable).count()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Floor-divide by `cell_size` and clamp into the grid.
    pub fn world_to_grid(&self, world_x: f32, world_y: f32) -> GridPos {
        let clamp_axis = |w: f32, dim: u32| -> u32 {
            // NaN casts to 0, infinities saturate.
            let cell = (w / self.cell_size).floor() as i64;
            cell.clamp(0, dim as i64 - 1) as u32
        };
        GridPos {
            x: clamp_axis(world_x, self.width),
            y: clamp_axis(world_y, self.height),
        }
    }

    /// Centre of the cell in world units.
    pub fn grid_to_world(&self, pos: GridPos) -> Vec2 {
        Vec2 {
            x: pos.x as f32 * self.cell_size + self.cell_size * 0.5,
            y: pos.y as f32 * self.cell_size + self.cell_size * 0.5,
        }
    }

    /// Whether the world point lies on a walkable cell (clamped like
    /// [`world_to_grid`](Self::world_to_grid)).
    pub fn is_world_walkable(&self, world_x: f32, world_y: f32) -> bool {
        let pos = self.world_to_grid(world_x, world_y);
        self.is_walkable(pos.x, pos.y)
    }

    /// In-bounds walkable neighbours of `pos` with the step length
    /// (1.0 orthogonal, 1.414 diagonal).
    pub fn walkable_neighbors(&self, pos: GridPos) -> impl Iterator<Item = (GridPos, f32)> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = pos.x as i64 + dx as i64;
            let ny = pos.y as i64 + dy as i64;
            if !self.contains(nx, ny) {
                return None;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if !self.is_walkable(nx, ny) {
                return None;
            }
            let step = if dx != 0 && dy != 0 { 1.414 } else { 1.0 };
            Some((GridPos::new(nx, ny), step))
        })
    }

    /// Label 8-connected walkable components with ids starting at 1.
    /// Returns the number of regions found.
    pub fn update_regions(&mut self) -> u16 {
        for cell in &mut self.cells {
            cell.region_id = 0;
        }

        let mut next_region: u16 = 0;
        let mut queue = VecDeque::new();

        for start in 0..self.cells.len() {
            if !self.cells[start].walkable || self.cells[start].region_id != 0 {
                continue;
            }
            next_region = next_region.saturating_add(1);
            self.cells[start].region_id = next_region;
            queue.push_back(start);

            while let Some(i) = queue.pop_front() {
                let pos = GridPos::new(i as u32 % self.width, i as u32 / self.width);
                let neighbors: Vec<GridPos> =
                    self.walkable_neighbors(pos).map(|(n, _)| n).collect();
                for n in neighbors {
                    let ni = (n.y * self.width + n.x) as usize;
                    if self.cells[ni].region_id == 0 {
                        self.cells[ni].region_id = next_region;
                        queue.push_back(ni);
                    }
                }
            }
        }

        self.region_count = next_region;
        self.regions_fresh = true;
        log::debug!(
            "Labelled {} regions on {}x{} grid",
            next_region,
            self.width,
            self.height
        );
        next_region
    }

    /// True while the region labels match the current walkability.
    pub fn regions_fresh(&self) -> bool {
        self.regions_fresh
    }

    pub fn region_count(&self) -> u16 {
        if self.regions_fresh {
            self.region_count
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_walkable_cost_one() {
        let grid = NavGrid::new();
        assert_eq!(grid.width(), 256);
        assert_eq!(grid.height(), 256);
        assert_eq!(grid.cell_size(), 2.0);
        assert_eq!(grid.walkable_count(), 256 * 256);
        assert_eq!(grid.cost(10, 10), 1);
    }

    #[test]
    fn dimensions_are_clamped() {
        let grid = NavGrid::with_dimensions(1000, 0, 1.0).unwrap();
        assert_eq!(grid.width(), MAX_GRID_WIDTH);
        assert_eq!(grid.height(), 1);
    }

    #[test]
    fn bad_cell_size_is_rejected() {
        let mut grid = NavGrid::with_dimensions(10, 10, 2.0).unwrap();
        assert_eq!(
            grid.set_dimensions(5, 5, 0.0),
            Err(NavError::InvalidCellSize(0.0))
        );
        assert!(grid.set_dimensions(5, 5, f32::NAN).is_err());
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.cell_size(), 2.0);
    }

    #[test]
    fn out_of_range_mutation_is_ignored() {
        let mut grid = NavGrid::with_dimensions(4, 4, 1.0).unwrap();
        assert!(!grid.set_walkable(4, 0, false));
        assert!(!grid.set_cost(0, 99, 9));
        assert_eq!(grid.walkable_count(), 16);
        assert!(!grid.is_walkable(4, 0));
        assert_eq!(grid.cost(4, 0), 255);
    }

    #[test]
    fn zero_cost_stored_as_one() {
        let mut grid = NavGrid::with_dimensions(4, 4, 1.0).unwrap();
        grid.set_cost(1, 1, 0);
        assert_eq!(grid.cost(1, 1), 1);
        grid.set_cost(1, 1, 7);
        assert_eq!(grid.cost(1, 1), 7);
    }

    #[test]
    fn world_to_grid_clamps() {
        let grid = NavGrid::with_dimensions(10, 10, 2.0).unwrap();
        assert_eq!(grid.world_to_grid(-5.0, -0.1), GridPos::new(0, 0));
        assert_eq!(grid.world_to_grid(1000.0, 19.99), GridPos::new(9, 9));
        assert_eq!(grid.world_to_grid(3.9, 4.0), GridPos::new(1, 2));
        assert_eq!(grid.world_to_grid(f32::NAN, f32::INFINITY), GridPos::new(0, 9));
    }

    #[test]
    fn grid_to_world_is_cell_centre() {
        let grid = NavGrid::with_dimensions(10, 10, 2.0).unwrap();
        let w = grid.grid_to_world(GridPos::new(0, 9));
        assert_eq!((w.x, w.y), (1.0, 19.0));
    }

    #[test]
    fn resize_resets_cells() {
        let mut grid = NavGrid::with_dimensions(10, 10, 2.0).unwrap();
        grid.set_walkable(1, 1, false);
        grid.set_dimensions(10, 10, 4.0).unwrap();
        assert!(!grid.is_walkable(1, 1), "same size keeps cells");
        grid.set_dimensions(12, 10, 4.0).unwrap();
        assert!(grid.is_walkable(1, 1));
    }

    #[test]
    fn corner_has_three_neighbors() {
        let grid = NavGrid::with_dimensions(5, 5, 1.0).unwrap();
        let n: Vec<_> = grid.walkable_neighbors(GridPos::new(0, 0)).collect();
        assert_eq!(n.len(), 3);
        assert!(n.iter().any(|&(p, step)| p == GridPos::new(1, 1) && step > 1.4));
    }

    #[test]
    fn regions_split_by_wall() {
        let mut grid = NavGrid::with_dimensions(7, 5, 1.0).unwrap();
        grid.fill_rect(3, 0, 3, 4, false);
        assert_eq!(grid.update_regions(), 2);
        assert!(grid.regions_fresh());
        assert_ne!(grid.region_id(0, 0), grid.region_id(6, 4));
        assert_eq!(grid.region_id(3, 2), 0);

        grid.set_walkable(3, 2, true);
        assert!(!grid.regions_fresh());
        assert_eq!(grid.region_count(), 0);
        assert_eq!(grid.update_regions(), 1);
    }

    #[test]
    fn diagonal_gap_connects_regions() {
        let mut grid = NavGrid::with_dimensions(2, 2, 1.0).unwrap();
        grid.set_walkable(1, 0, false);
        grid.set_walkable(0, 1, false);
        assert_eq!(grid.update_regions(), 1);
    }

    #[test]
    fn from_cells_checks_length() {
        assert!(NavGrid::from_cells(2, 2, 1.0, vec![GridCell::default(); 3]).is_err());
        let grid = NavGrid::from_cells(2, 2, 1.0, vec![GridCell::default(); 4]).unwrap();
        assert_eq!(grid.cell_count(), 4);
    }
}
