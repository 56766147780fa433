//! Post-processing of stored paths.
//!
//! [`PathSmoother`] is the extension point behind `smooth_path` and
//! `simplify_path`. Both methods default to doing nothing, which is what
//! [`NoSmoothing`] (the installed default) relies on. [`LineOfSightSmoother`]
//! is a real implementation that never cuts through blocked cells.

use crate::grid::NavGrid;
use crate::path::Waypoint;
use crate::spatial::line_of_sight;

pub trait PathSmoother: Send + Sync {
    /// Remove unnecessary zig-zags. Endpoints must be kept.
    fn smooth(&self, _grid: &NavGrid, _waypoints: &mut Vec<Waypoint>) {}

    /// Drop waypoints that deviate less than `max_deviation` from the
    /// simplified line. Endpoints must be kept.
    fn simplify(&self, _grid: &NavGrid, _waypoints: &mut Vec<Waypoint>, _max_deviation: f32) {}
}

/// Leaves paths exactly as A* produced them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSmoothing;

impl PathSmoother for NoSmoothing {}

/// String pulling and Ramer–Douglas–Peucker simplification, both
/// constrained by grid line of sight for a unit of `clearance` radius.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineOfSightSmoother {
    pub clearance: f32,
}

impl LineOfSightSmoother {
    pub fn new(clearance: f32) -> Self {
        Self { clearance }
    }

    fn visible(&self, grid: &NavGrid, a: Waypoint, b: Waypoint) -> bool {
        line_of_sight(grid, a.into(), b.into(), self.clearance)
    }

    fn rdp(
        &self,
        grid: &NavGrid,
        points: &[Waypoint],
        max_deviation: f32,
        keep: &mut [bool],
        offset: usize,
    ) {
        if points.len() < 3 {
            return;
        }
        let first = points[0];
        let last = points[points.len() - 1];

        let (mut worst, mut worst_dist) = (0, 0.0f32);
        for (i, p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
            let d = distance_to_segment(*p, first, last);
            if d > worst_dist {
                worst = i;
                worst_dist = d;
            }
        }

        if worst_dist > max_deviation || !self.visible(grid, first, last) {
            let split = if worst == 0 { points.len() / 2 } else { worst };
            keep[offset + split] = true;
            self.rdp(grid, &points[..=split], max_deviation, keep, offset);
            self.rdp(grid, &points[split..], max_deviation, keep, offset + split);
        }
    }
}

impl PathSmoother for LineOfSightSmoother {
    fn smooth(&self, grid: &NavGrid, waypoints: &mut Vec<Waypoint>) {
        if waypoints.len() < 3 {
            return;
        }
        let mut result = vec![waypoints[0]];
        let mut anchor = 0;
        while anchor < waypoints.len() - 1 {
            let mut farthest = anchor + 1;
            for j in (anchor + 2)..waypoints.len() {
                if self.visible(grid, waypoints[anchor], waypoints[j]) {
                    farthest = j;
                }
            }
            result.push(waypoints[farthest]);
            anchor = farthest;
        }
        *waypoints = result;
    }

    fn simplify(&self, grid: &NavGrid, waypoints: &mut Vec<Waypoint>, max_deviation: f32) {
        if waypoints.len() < 3 || !max_deviation.is_finite() || max_deviation <= 0.0 {
            return;
        }
        let mut keep = vec![false; waypoints.len()];
        keep[0] = true;
        keep[waypoints.len() - 1] = true;
        self.rdp(grid, waypoints, max_deviation, &mut keep, 0);

        let mut i = 0;
        waypoints.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
}

fn distance_to_segment(p: Waypoint, a: Waypoint, b: Waypoint) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq <= f32::EPSILON {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(&Waypoint::new(a.x + t * abx, a.y + t * aby))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::polyline_length;

    fn staircase() -> Vec<Waypoint> {
        // Cell centres of an L-ish A* route on a 1.0 grid
        vec![
            Waypoint::new(0.5, 0.5),
            Waypoint::new(1.5, 0.5),
            Waypoint::new(2.5, 0.5),
            Waypoint::new(3.5, 1.5),
            Waypoint::new(4.5, 2.5),
            Waypoint::new(5.5, 2.5),
        ]
    }

    #[test]
    fn no_smoothing_is_noop() {
        let grid = NavGrid::with_dimensions(8, 8, 1.0).unwrap();
        let mut pts = staircase();
        NoSmoothing.smooth(&grid, &mut pts);
        NoSmoothing.simplify(&grid, &mut pts, 10.0);
        assert_eq!(pts, staircase());
    }

    #[test]
    fn smoothing_open_grid_collapses_to_endpoints() {
        let grid = NavGrid::with_dimensions(8, 8, 1.0).unwrap();
        let mut pts = staircase();
        LineOfSightSmoother::default().smooth(&grid, &mut pts);
        assert_eq!(pts, vec![Waypoint::new(0.5, 0.5), Waypoint::new(5.5, 2.5)]);
    }

    #[test]
    fn smoothing_respects_walls() {
        let mut grid = NavGrid::with_dimensions(8, 8, 1.0).unwrap();
        grid.set_walkable(3, 0, false);
        grid.set_walkable(2, 1, false);
        grid.set_walkable(3, 2, false);
        let original = staircase();
        let mut pts = original.clone();
        LineOfSightSmoother::default().smooth(&grid, &mut pts);
        assert!(pts.len() > 2);
        assert_eq!(pts.first(), original.first());
        assert_eq!(pts.last(), original.last());
        assert!(polyline_length(&pts) <= polyline_length(&original) + 1e-4);
    }

    #[test]
    fn simplify_drops_collinear_points() {
        let grid = NavGrid::with_dimensions(8, 8, 1.0).unwrap();
        let mut pts: Vec<Waypoint> = (0..6).map(|i| Waypoint::new(i as f32 + 0.5, 0.5)).collect();
        LineOfSightSmoother::default().simplify(&grid, &mut pts, 0.1);
        assert_eq!(pts, vec![Waypoint::new(0.5, 0.5), Waypoint::new(5.5, 0.5)]);
    }

    #[test]
    fn simplify_keeps_real_corners() {
        let grid = NavGrid::with_dimensions(8, 8, 1.0).unwrap();
        let mut pts = vec![
            Waypoint::new(0.5, 0.5),
            Waypoint::new(4.5, 0.5),
            Waypoint::new(4.5, 4.5),
        ];
        LineOfSightSmoother::default().simplify(&grid, &mut pts, 0.5);
        assert_eq!(pts.len(), 3);
    }

    #[test]
    fn distance_to_degenerate_segment() {
        let a = Waypoint::new(1.0, 1.0);
        assert!((distance_to_segment(Waypoint::new(4.0, 5.0), a, a) - 5.0).abs() < 1e-6);
    }
}
