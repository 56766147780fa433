//! Human-readable summaries of grid, path and unit state.
//!
//! Each report is a plain struct so callers can inspect the numbers; the
//! `Display` impls produce the text the simtest harness prints.

use std::fmt;

use serde::Serialize;

use crate::grid::NavGrid;
use crate::math::Vec2;
use crate::movement::{MovementState, UnitBody, UnitDrive};
use crate::path::{Path, PathHandle, PathStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridInfo {
    pub width: u32,
    pub height: u32,
    pub cell_size: f32,
    pub walkable_cells: usize,
    pub total_cells: usize,
    /// `None` while region labels are stale.
    pub regions: Option<u16>,
}

impl GridInfo {
    pub fn from_grid(grid: &NavGrid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            cell_size: grid.cell_size(),
            walkable_cells: grid.walkable_count(),
            total_cells: grid.cell_count(),
            regions: grid.regions_fresh().then(|| grid.region_count()),
        }
    }
}

impl fmt::Display for GridInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pathfinding Grid Info:")?;
        writeln!(f, "Dimensions: {}x{}", self.width, self.height)?;
        writeln!(f, "Cell Size: {:.1}", self.cell_size)?;
        write!(f, "Walkable Cells: {} / {}", self.walkable_cells, self.total_cells)?;
        match self.regions {
            Some(n) => write!(f, "\nRegions: {}", n),
            None => write!(f, "\nRegions: stale"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathInfo {
    pub handle: u64,
    pub status: PathStatus,
    pub waypoints: usize,
    pub current_waypoint: usize,
    pub length: f32,
    pub compute_time_ms: f32,
    pub iterations: u32,
}

impl PathInfo {
    pub fn from_path(handle: PathHandle, path: &Path) -> Self {
        Self {
            handle: handle.raw(),
            status: path.status,
            waypoints: path.waypoints.len(),
            current_waypoint: path.current_waypoint,
            length: path.length,
            compute_time_ms: path.compute_time_ms,
            iterations: path.iterations,
        }
    }
}

impl fmt::Display for PathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path Info:")?;
        writeln!(f, "Handle: {}", self.handle)?;
        writeln!(f, "Status: {:?}", self.status)?;
        writeln!(f, "Waypoints: {} (cursor {})", self.waypoints, self.current_waypoint)?;
        writeln!(f, "Length: {:.1}", self.length)?;
        write!(
            f,
            "Search: {} iterations, {:.3} ms",
            self.iterations, self.compute_time_ms
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitInfo {
    pub unit_id: u32,
    pub state: MovementState,
    pub position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    pub max_speed: f32,
    pub radius: f32,
    pub target: Option<Vec2>,
}

impl UnitInfo {
    pub fn from_parts(body: &UnitBody, drive: &UnitDrive) -> Self {
        Self {
            unit_id: body.unit_id,
            state: drive.state,
            position: body.position,
            velocity: body.velocity,
            speed: body.velocity.length(),
            max_speed: drive.max_speed,
            radius: body.radius,
            target: drive.target,
        }
    }
}

impl fmt::Display for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unit {}:", self.unit_id)?;
        writeln!(f, "State: {:?}", self.state)?;
        writeln!(f, "Position: ({:.2}, {:.2})", self.position.x, self.position.y)?;
        writeln!(
            f,
            "Speed: {:.2} / {:.2}",
            self.speed, self.max_speed
        )?;
        match self.target {
            Some(t) => write!(f, "Target: ({:.2}, {:.2})", t.x, t.y),
            None => write!(f, "Target: none"),
        }
    }
}

/// Whole-instance counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub active_paths: usize,
    pub path_capacity: usize,
    pub units: usize,
    pub unit_capacity: usize,
    pub moving_units: usize,
    pub overlapping_units: usize,
    pub error_count: u32,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "paths {}/{} | units {}/{} ({} moving, {} overlapping) | errors {}",
            self.active_paths,
            self.path_capacity,
            self.units,
            self.unit_capacity,
            self.moving_units,
            self.overlapping_units,
            self.error_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_info_text() {
        let mut grid = NavGrid::with_dimensions(4, 4, 2.0).unwrap();
        grid.set_walkable(0, 0, false);
        let info = GridInfo::from_grid(&grid);
        assert_eq!(info.walkable_cells, 15);
        assert_eq!(info.regions, None);
        let text = info.to_string();
        assert!(text.contains("Dimensions: 4x4"));
        assert!(text.contains("Walkable Cells: 15 / 16"));

        grid.update_regions();
        assert_eq!(GridInfo::from_grid(&grid).regions, Some(1));
    }

    #[test]
    fn test_unit_info_text() {
        let body = UnitBody {
            unit_id: 9,
            position: Vec2::new(1.0, 2.0),
            velocity: Vec2::new(3.0, 4.0),
            radius: 0.5,
        };
        let drive = UnitDrive {
            desired_speed: 5.0,
            max_speed: 5.0,
            acceleration: 1.0,
            target: None,
            state: MovementState::Moving,
            pending_force: Vec2::ZERO,
            stall_time: 0.0,
        };
        let info = UnitInfo::from_parts(&body, &drive);
        assert_eq!(info.speed, 5.0);
        assert!(info.to_string().contains("Target: none"));
    }

    #[test]
    fn test_stats_line() {
        let stats = Stats {
            active_paths: 2,
            path_capacity: 10,
            ..Stats::default()
        };
        assert!(stats.to_string().starts_with("paths 2/10"));
    }
}
