//! Pathfinder - the single entry point owning grid, paths and units
//!
//! Every public operation is infallible from the caller's side: errors
//! from the core are turned into a sentinel (`PathHandle::NULL`, `false`,
//! zero), recorded as the last error string and counted.

use std::io::{Read, Write};

use crate::astar::AStar;
use crate::collision::{self, check_collision};
use crate::config::NavConfig;
use crate::diagnostics::{GridInfo, PathInfo, Stats, UnitInfo};
use crate::error::{NavError, NavResult};
use crate::formation::FormationType;
use crate::grid::{GridPos, NavGrid};
use crate::math::Vec2;
use crate::movement::{MovementSimulator, MovementState};
use crate::path::{PathHandle, PathStatus, PathStore, Waypoint};
use crate::persistence::{self, SaveError};
use crate::smoothing::{NoSmoothing, PathSmoother};
use crate::spatial;
use crate::steering::Behavior;

/// Main pathfinding and movement instance
pub struct Pathfinder {
    config: NavConfig,
    grid: NavGrid,
    astar: AStar,
    paths: PathStore,
    movement: MovementSimulator,
    smoother: Box<dyn PathSmoother>,
    last_error: Option<String>,
    error_count: u32,
    initialized: bool,
    /// Seconds accumulated by `update`
    sim_time: f64,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new()
    }
}

impl Pathfinder {
    /// Create an instance with the default configuration and a 256x256 grid
    pub fn new() -> Self {
        Self::build(NavConfig::default())
    }

    /// Create an instance from a validated configuration
    pub fn with_config(config: NavConfig) -> NavResult<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(NavError::Config(problems.join("; ")));
        }
        Ok(Self::build(config))
    }

    fn build(config: NavConfig) -> Self {
        let mut astar = AStar::new(config.max_iterations);
        astar.set_allow_partial(config.allow_partial_paths);
        Self {
            grid: NavGrid::new(),
            astar,
            paths: PathStore::new(config.max_paths, config.max_waypoints),
            movement: MovementSimulator::new(&config),
            smoother: Box::new(NoSmoothing),
            last_error: None,
            error_count: 0,
            initialized: false,
            sim_time: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn movement(&self) -> &MovementSimulator {
        &self.movement
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Turn an error into the recorded last error
    fn record(&mut self, err: NavError) {
        match &err {
            NavError::PathTableFull { .. } | NavError::UnitTableFull { .. } => {
                log::warn!("{}", err)
            }
            _ => log::debug!("{}", err),
        }
        self.last_error = Some(err.to_string());
        self.error_count = self.error_count.saturating_add(1);
    }

    fn check<T>(&mut self, result: NavResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    // ---- Lifecycle ----

    /// Reset path and unit tables. Calling it again while initialized does nothing.
    pub fn initialize(&mut self) {
        if self.initialized {
            log::debug!("pathfinder already initialized");
            return;
        }
        self.paths.clear();
        self.movement.clear();
        self.initialized = true;
        log::info!(
            "Pathfinder initialized: grid {}x{}, cell size {:.1}",
            self.grid.width(),
            self.grid.height(),
            self.grid.cell_size()
        );
    }

    /// Drop every path and unit. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.paths.clear();
        self.movement.clear();
        self.initialized = false;
        log::info!("Pathfinder shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ---- Grid ----

    pub fn set_grid_dimensions(&mut self, width: u32, height: u32, cell_size: f32) -> bool {
        let result = self.grid.set_dimensions(width, height, cell_size);
        self.check(result).is_some()
    }

    pub fn set_cell_walkable(&mut self, x: u32, y: u32, walkable: bool) -> bool {
        self.grid.set_walkable(x, y, walkable)
    }

    pub fn set_cell_cost(&mut self, x: u32, y: u32, cost: u8) -> bool {
        self.grid.set_cost(x, y, cost)
    }

    pub fn is_cell_walkable(&self, x: u32, y: u32) -> bool {
        self.grid.is_walkable(x, y)
    }

    pub fn cell_cost(&self, x: u32, y: u32) -> u8 {
        self.grid.cost(x, y)
    }

    pub fn world_to_grid(&self, world_x: f32, world_y: f32) -> GridPos {
        self.grid.world_to_grid(world_x, world_y)
    }

    pub fn grid_to_world(&self, grid_x: u32, grid_y: u32) -> Vec2 {
        self.grid.grid_to_world(GridPos::new(grid_x, grid_y))
    }

    /// Label connected regions; returns how many were found
    pub fn update_regions(&mut self) -> u16 {
        let regions = self.grid.update_regions();
        log::debug!("{} walkable regions", regions);
        regions
    }

    /// Navigation meshes are not supported; always records an error
    pub fn build_navigation_mesh(&mut self) -> bool {
        self.record(NavError::Unsupported("navigation mesh construction"));
        false
    }

    // ---- Paths ----

    /// Find a path between two world positions. `unit_radius` is accepted
    /// for API compatibility; the grid search treats every unit as a point.
    pub fn find_path(
        &mut self,
        start_x: f32,
        start_y: f32,
        goal_x: f32,
        goal_y: f32,
        unit_radius: f32,
    ) -> PathHandle {
        let result = self.paths.find_path(
            &self.grid,
            &mut self.astar,
            Vec2::new(start_x, start_y),
            Vec2::new(goal_x, goal_y),
        );
        match self.check(result) {
            Some(handle) => {
                log::trace!(
                    "path {} found ({} waypoints, radius {:.2})",
                    handle.raw(),
                    self.paths.waypoint_count(handle),
                    unit_radius
                );
                handle
            }
            None => PathHandle::NULL,
        }
    }

    /// Same as [`find_path`](Self::find_path); dynamic obstacles are not
    /// considered.
    pub fn find_path_avoiding_objects(
        &mut self,
        start_x: f32,
        start_y: f32,
        goal_x: f32,
        goal_y: f32,
        unit_radius: f32,
        obstacles: &[Vec2],
    ) -> PathHandle {
        if !obstacles.is_empty() {
            log::debug!("ignoring {} dynamic obstacles", obstacles.len());
        }
        self.find_path(start_x, start_y, goal_x, goal_y, unit_radius)
    }

    pub fn cancel_path(&mut self, handle: PathHandle) -> bool {
        if self.paths.cancel(handle) {
            true
        } else {
            self.record(NavError::UnknownPath(handle.raw()));
            false
        }
    }

    pub fn path_status(&self, handle: PathHandle) -> PathStatus {
        self.paths.status(handle)
    }

    pub fn path_waypoint_count(&self, handle: PathHandle) -> usize {
        self.paths.waypoint_count(handle)
    }

    pub fn path_waypoints(&self, handle: PathHandle) -> Vec<Waypoint> {
        self.paths.waypoints(handle)
    }

    pub fn path_length(&self, handle: PathHandle) -> f32 {
        self.paths.length(handle)
    }

    pub fn next_waypoint(&self, handle: PathHandle) -> Waypoint {
        self.paths.next_waypoint(handle)
    }

    pub fn advance_waypoint(&mut self, handle: PathHandle) -> bool {
        self.paths.advance(handle)
    }

    pub fn reset_waypoints(&mut self, handle: PathHandle) -> bool {
        self.paths.rewind(handle)
    }

    pub fn path_compute_time(&self, handle: PathHandle) -> f32 {
        self.paths.compute_time_ms(handle)
    }

    pub fn active_path_count(&self) -> usize {
        self.paths.active_count()
    }

    /// Install the strategy used by `smooth_path` and `simplify_path`
    pub fn set_smoother(&mut self, smoother: Box<dyn PathSmoother>) {
        self.smoother = smoother;
    }

    pub fn smooth_path(&mut self, handle: PathHandle) -> bool {
        self.paths.smooth(handle, &self.grid, self.smoother.as_ref())
    }

    pub fn simplify_path(&mut self, handle: PathHandle, max_deviation: f32) -> bool {
        self.paths
            .simplify(handle, &self.grid, max_deviation, self.smoother.as_ref())
    }

    // ---- Units ----

    pub fn add_unit(
        &mut self,
        unit_id: u32,
        x: f32,
        y: f32,
        max_speed: f32,
        acceleration: f32,
        radius: f32,
    ) -> bool {
        let result = self
            .movement
            .add_unit(unit_id, Vec2::new(x, y), max_speed, acceleration, radius);
        self.check(result).is_some()
    }

    pub fn remove_unit(&mut self, unit_id: u32) -> bool {
        if self.movement.remove_unit(unit_id) {
            true
        } else {
            self.record(NavError::UnknownUnit(unit_id));
            false
        }
    }

    pub fn set_unit_target(&mut self, unit_id: u32, x: f32, y: f32) -> bool {
        let result = self.movement.set_target(unit_id, Vec2::new(x, y));
        self.check(result).is_some()
    }

    pub fn stop_unit(&mut self, unit_id: u32) -> bool {
        let result = self.movement.stop(unit_id);
        self.check(result).is_some()
    }

    pub fn set_unit_speed(&mut self, unit_id: u32, speed: f32) -> bool {
        let result = self.movement.set_speed(unit_id, speed);
        self.check(result).is_some()
    }

    pub fn set_unit_max_speed(&mut self, unit_id: u32, max_speed: f32) -> bool {
        let result = self.movement.set_max_speed(unit_id, max_speed);
        self.check(result).is_some()
    }

    pub fn set_unit_acceleration(&mut self, unit_id: u32, acceleration: f32) -> bool {
        let result = self.movement.set_acceleration(unit_id, acceleration);
        self.check(result).is_some()
    }

    pub fn set_collision_radius(&mut self, unit_id: u32, radius: f32) -> bool {
        let result = self.movement.set_radius(unit_id, radius);
        self.check(result).is_some()
    }

    pub fn unit_state(&self, unit_id: u32) -> MovementState {
        self.movement.state(unit_id)
    }

    pub fn unit_position(&self, unit_id: u32) -> Option<Vec2> {
        self.movement.position(unit_id)
    }

    pub fn unit_velocity(&self, unit_id: u32) -> Option<Vec2> {
        self.movement.velocity(unit_id)
    }

    pub fn unit_speed(&self, unit_id: u32) -> f32 {
        self.movement.speed(unit_id)
    }

    pub fn unit_count(&self) -> usize {
        self.movement.unit_count()
    }

    pub fn moving_unit_count(&self) -> usize {
        self.movement.moving_count()
    }

    pub fn nearby_units(&self, unit_id: u32, radius: f32, max_results: usize) -> Vec<u32> {
        self.movement.nearby_units(unit_id, radius, max_results)
    }

    // ---- Collision and steering ----

    pub fn check_collision(&self, x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        check_collision(x1, y1, r1, x2, y2, r2)
    }

    /// Desired velocity after repulsion from neighbours; zero for unknown units
    pub fn avoid_collision(&self, unit_id: u32) -> Vec2 {
        self.movement.avoid_collision(unit_id)
    }

    pub fn apply_steering(&mut self, unit_id: u32, steer_x: f32, steer_y: f32, magnitude: f32) -> bool {
        let result = self
            .movement
            .apply_steering(unit_id, Vec2::new(steer_x, steer_y), magnitude);
        self.check(result).is_some()
    }

    pub fn apply_seek_behavior(&mut self, unit_id: u32, target_x: f32, target_y: f32, max_force: f32) -> bool {
        let result = self
            .movement
            .apply_seek(unit_id, Vec2::new(target_x, target_y), max_force);
        self.check(result).is_some()
    }

    pub fn apply_avoidance_behavior(&mut self, unit_id: u32, obstacles: &[Vec2], max_force: f32) -> bool {
        let result = self.movement.apply_avoidance(unit_id, obstacles, max_force);
        self.check(result).is_some()
    }

    /// Add a custom steering behavior to every unit's force sum
    pub fn add_behavior(&mut self, weight: f32, behavior: Box<dyn Behavior>) {
        self.movement.add_behavior(weight, behavior);
    }

    // ---- Formations ----

    pub fn create_formation(&mut self, kind: FormationType, unit_ids: &[u32]) -> bool {
        let result = self.movement.create_formation(kind, unit_ids);
        self.check(result).is_some()
    }

    pub fn move_formation(&mut self, leader_id: u32, target_x: f32, target_y: f32) -> bool {
        let result = self
            .movement
            .move_formation(leader_id, Vec2::new(target_x, target_y));
        self.check(result).is_some()
    }

    pub fn set_formation_spacing(&mut self, kind: FormationType, spacing: f32) -> bool {
        let result = self.movement.set_formation_spacing(kind, spacing);
        self.check(result).is_some()
    }

    pub fn disband_formation(&mut self) -> bool {
        self.movement.disband_formation()
    }

    // ---- Spatial ----

    pub fn is_path_obstructed(&self, start_x: f32, start_y: f32, end_x: f32, end_y: f32, radius: f32) -> bool {
        spatial::is_path_obstructed(
            &self.grid,
            Vec2::new(start_x, start_y),
            Vec2::new(end_x, end_y),
            radius,
        )
    }

    pub fn line_of_sight(&self, from_x: f32, from_y: f32, to_x: f32, to_y: f32, radius: f32) -> bool {
        spatial::line_of_sight(
            &self.grid,
            Vec2::new(from_x, from_y),
            Vec2::new(to_x, to_y),
            radius,
        )
    }

    // ---- Update ----

    /// Advance the simulation by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return;
        }
        self.sim_time += delta_time as f64;
        self.update_movement(delta_time);
    }

    /// Advance unit movement only
    pub fn update_movement(&mut self, delta_time: f32) {
        self.movement.update(delta_time, &self.grid);
    }

    // ---- Errors and diagnostics ----

    /// Message of the most recent error, or "" if there is none
    pub fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or("")
    }

    /// Reset the error state and return how many errors were recorded
    pub fn clear_errors(&mut self) -> u32 {
        let count = self.error_count;
        self.error_count = 0;
        self.last_error = None;
        count
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn grid_info(&self) -> GridInfo {
        GridInfo::from_grid(&self.grid)
    }

    pub fn path_info(&self, handle: PathHandle) -> Option<PathInfo> {
        self.paths
            .with_path(handle, |path| PathInfo::from_path(handle, path))
    }

    pub fn unit_info(&self, unit_id: u32) -> Option<UnitInfo> {
        let body = self.movement.body(unit_id)?;
        let drive = self.movement.drive(unit_id)?;
        Some(UnitInfo::from_parts(&body, &drive))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            active_paths: self.paths.active_count(),
            path_capacity: self.paths.capacity(),
            units: self.movement.unit_count(),
            unit_capacity: self.movement.capacity(),
            moving_units: self.movement.moving_count(),
            overlapping_units: collision::overlapping_pairs(&self.movement.snapshot()),
            error_count: self.error_count,
        }
    }

    // ---- Persistence ----

    /// Save the grid and every unit
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_grid(writer, &self.grid, &self.movement)
    }

    /// Replace the grid and units from a snapshot. Paths and the active
    /// formation are dropped; steering behaviors and formation spacing stay.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = persistence::load_grid(reader)?;
        let mut staged = MovementSimulator::new(&self.config);
        for unit in loaded.units {
            staged.restore_unit(unit.body, unit.drive)?;
        }
        self.grid = loaded.grid;
        self.movement.replace_units(staged);
        self.paths.clear();
        log::info!(
            "Loaded grid {}x{} with {} units",
            self.grid.width(),
            self.grid.height(),
            self.movement.unit_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_by_ten() -> Pathfinder {
        let mut pf = Pathfinder::new();
        pf.initialize();
        assert!(pf.set_grid_dimensions(10, 10, 1.0));
        pf
    }

    #[test]
    fn test_lifecycle_idempotent() {
        let mut pf = Pathfinder::new();
        pf.initialize();
        assert!(pf.add_unit(1, 5.0, 5.0, 3.0, 1.0, 0.5));
        pf.initialize();
        assert_eq!(pf.unit_count(), 1);
        pf.shutdown();
        pf.shutdown();
        assert_eq!(pf.unit_count(), 0);
        assert!(!pf.is_initialized());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NavConfig {
            max_paths: 0,
            ..NavConfig::default()
        };
        assert!(matches!(Pathfinder::with_config(config), Err(NavError::Config(_))));
    }

    #[test]
    fn test_diagonal_path() {
        let mut pf = ten_by_ten();
        let handle = pf.find_path(0.5, 0.5, 9.5, 9.5, 0.5);
        assert!(!handle.is_null());
        assert_eq!(pf.path_status(handle), PathStatus::Found);
        assert_eq!(pf.path_waypoint_count(handle), 10);
        assert!((pf.path_length(handle) - 9.0 * 2f32.sqrt()).abs() < 0.01);
        assert!(pf.path_info(handle).is_some());
    }

    #[test]
    fn test_failure_sets_last_error() {
        let mut pf = ten_by_ten();
        pf.set_cell_walkable(9, 9, false);
        let handle = pf.find_path(0.5, 0.5, 9.5, 9.5, 0.0);
        assert!(handle.is_null());
        assert_eq!(pf.path_status(handle), PathStatus::Failed);
        assert!(pf.last_error().contains("not walkable"));
        assert_eq!(pf.clear_errors(), 1);
        assert_eq!(pf.last_error(), "");
        assert_eq!(pf.clear_errors(), 0);
    }

    #[test]
    fn test_cancel_invalidates() {
        let mut pf = ten_by_ten();
        let h = pf.find_path(0.5, 0.5, 5.5, 0.5, 0.0);
        assert!(pf.cancel_path(h));
        assert!(!pf.cancel_path(h));
        assert_eq!(pf.path_status(h), PathStatus::Failed);
        assert_eq!(pf.active_path_count(), 0);
    }

    #[test]
    fn test_navigation_mesh_unsupported() {
        let mut pf = ten_by_ten();
        assert!(!pf.build_navigation_mesh());
        assert!(pf.last_error().contains("Unsupported"));
    }

    #[test]
    fn test_unit_roundtrip_through_facade() {
        let mut pf = ten_by_ten();
        assert!(pf.add_unit(4, 1.5, 1.5, 2.0, 4.0, 0.25));
        assert!(!pf.add_unit(4, 1.5, 1.5, 2.0, 4.0, 0.25));
        assert!(pf.set_unit_target(4, 8.5, 1.5));
        assert_eq!(pf.moving_unit_count(), 1);
        for _ in 0..80 {
            pf.update(0.1);
        }
        assert_eq!(pf.unit_state(4), MovementState::AtDestination);
        assert_eq!(pf.unit_position(4), Some(Vec2::new(8.5, 1.5)));
        assert_eq!(pf.unit_state(77), MovementState::Idle);
        assert!(!pf.set_unit_target(77, 0.0, 0.0));
        assert!(pf.unit_info(4).is_some());
        assert_eq!(pf.stats().units, 1);
    }

    #[test]
    fn test_save_and_load() {
        let mut pf = ten_by_ten();
        pf.set_cell_walkable(3, 3, false);
        pf.add_unit(1, 0.5, 0.5, 1.0, 1.0, 0.5);
        let h = pf.find_path(0.5, 0.5, 8.5, 8.5, 0.0);
        let mut buffer = Vec::new();
        pf.save(&mut buffer).expect("Save failed");

        let mut other = Pathfinder::new();
        other.load(&buffer[..]).expect("Load failed");
        assert!(!other.is_cell_walkable(3, 3));
        assert_eq!(other.grid_info().width, 10);
        assert_eq!(other.unit_position(1), Some(Vec2::new(0.5, 0.5)));
        assert_eq!(other.path_status(h), PathStatus::Failed);
    }

    struct Marker;

    impl Behavior for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }
    }

    #[test]
    fn test_load_keeps_behaviors_and_spacing() {
        let mut pf = ten_by_ten();
        pf.add_unit(1, 0.5, 0.5, 1.0, 1.0, 0.5);
        pf.add_behavior(0.5, Box::new(Marker));
        assert!(pf.set_formation_spacing(FormationType::Wedge, 7.0));
        let mut buffer = Vec::new();
        pf.save(&mut buffer).expect("Save failed");

        pf.load(&buffer[..]).expect("Load failed");
        assert!(pf.movement().behaviors().any(|(name, _)| name == "marker"));
        assert_eq!(pf.movement().formation_spacing(FormationType::Wedge), 7.0);
        assert_eq!(pf.unit_count(), 1);
    }

    #[test]
    fn test_loaded_waiting_leader_resumes() {
        let mut pf = Pathfinder::new();
        pf.initialize();
        assert!(pf.set_grid_dimensions(128, 32, 1.0));
        assert!(pf.add_unit(1, 30.0, 10.0, 5.0, 2.0, 0.5));
        assert!(pf.add_unit(2, 2.0, 10.0, 5.0, 5.0, 0.5));
        assert!(pf.create_formation(FormationType::Column, &[1, 2]));
        assert!(pf.move_formation(1, 100.0, 10.0));
        pf.update(0.1);
        assert_eq!(pf.unit_state(1), MovementState::Waiting);
        let mut buffer = Vec::new();
        pf.save(&mut buffer).expect("Save failed");

        let mut other = Pathfinder::new();
        other.load(&buffer[..]).expect("Load failed");
        assert!(other.movement().formation().is_none());
        assert_eq!(other.unit_state(1), MovementState::Moving);
        let before = other.unit_position(1).unwrap();
        other.update(0.1);
        assert!(other.unit_position(1).unwrap().x > before.x);
    }
}
