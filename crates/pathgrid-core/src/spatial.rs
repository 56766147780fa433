//! Segment-vs-grid queries: obstruction and line of sight.
//!
//! A segment is obstructed when any grid cell it passes over is not
//! walkable. Cells are enumerated with Bresenham's line; a unit radius is
//! handled by also walking parallel segments offset sideways up to
//! `radius`, no further apart than half a cell.

use crate::grid::{GridPos, NavGrid};
use crate::math::Vec2;

/// Cells on the Bresenham line from `from` to `to`, both included.
pub fn cells_on_line(from: GridPos, to: GridPos) -> Vec<GridPos> {
    let (mut x0, mut y0) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut cells = Vec::with_capacity((dx.max(dy) + 1) as usize);
    loop {
        cells.push(GridPos::new(x0 as u32, y0 as u32));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
    cells
}

/// True when every cell under the centre line is walkable.
pub fn segment_clear(grid: &NavGrid, from: Vec2, to: Vec2) -> bool {
    let a = grid.world_to_grid(from.x, from.y);
    let b = grid.world_to_grid(to.x, to.y);
    cells_on_line(a, b)
        .into_iter()
        .all(|c| grid.is_walkable(c.x, c.y))
}

/// Whether a unit of `radius` travelling from `start` to `end` would cross
/// a non-walkable cell. Non-finite input counts as obstructed.
pub fn is_path_obstructed(grid: &NavGrid, start: Vec2, end: Vec2, radius: f32) -> bool {
    if !start.is_finite() || !end.is_finite() {
        return true;
    }
    if !segment_clear(grid, start, end) {
        return true;
    }

    let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    if radius == 0.0 {
        return false;
    }

    let dir = (end - start).normalize();
    // A zero-length segment still sweeps a disc; probe along +x.
    let side = if dir == Vec2::ZERO {
        Vec2::new(1.0, 0.0)
    } else {
        dir.perp()
    };
    let steps = (radius / (grid.cell_size() * 0.5)).ceil().max(1.0) as i32;
    for k in 1..=steps {
        let offset = side * (radius * k as f32 / steps as f32);
        for shift in [offset, -offset] {
            if !segment_clear(grid, start + shift, end + shift) {
                return true;
            }
        }
    }
    false
}

pub fn line_of_sight(grid: &NavGrid, from: Vec2, to: Vec2, radius: f32) -> bool {
    !is_path_obstructed(grid, from, to, radius)
}
