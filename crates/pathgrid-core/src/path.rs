//! Path records and the handle-addressed table that owns them.
//!
//! Paths live as entities in a private `hecs::World`. A [`PathHandle`] is
//! the entity's bit pattern, so it carries a generation: once a path is
//! cancelled its handle stays dead even after the slot is reused.
//! `PathHandle::NULL` (0) is never produced for a live path.

use std::time::Instant;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::astar::AStar;
use crate::error::{NavError, NavResult};
use crate::grid::{GridPos, NavGrid};
use crate::math::Vec2;
use crate::smoothing::PathSmoother;

/// World-space point on a path (a cell centre when produced by A*).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Waypoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<Waypoint> for Vec2 {
    fn from(w: Waypoint) -> Self {
        Vec2::new(w.x, w.y)
    }
}

impl From<Vec2> for Waypoint {
    fn from(v: Vec2) -> Self {
        Waypoint::new(v.x, v.y)
    }
}

/// Sum of consecutive waypoint distances.
pub fn polyline_length(waypoints: &[Waypoint]) -> f32 {
    waypoints.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStatus {
    Idle = 0,
    Finding = 1,
    Found = 2,
    /// Clipped at the iteration cap or the waypoint capacity.
    Partial = 3,
    Failed = 4,
}

/// Opaque path token; 0 means "no path".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandle(pub u64);

impl PathHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    fn from_entity(entity: Entity) -> Self {
        Self(entity.to_bits().get())
    }

    fn entity(&self) -> Option<Entity> {
        Entity::from_bits(self.0)
    }
}

/// A computed route.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
    pub current_waypoint: usize,
    pub status: PathStatus,
    pub length: f32,
    pub start: GridPos,
    pub goal: GridPos,
    pub compute_time_ms: f32,
    pub iterations: u32,
}

impl Path {
    /// Waypoint under the cursor, if any remain.
    pub fn next_waypoint(&self) -> Option<Waypoint> {
        self.waypoints.get(self.current_waypoint).copied()
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len().saturating_sub(self.current_waypoint)
    }

    fn recompute(&mut self) {
        self.length = polyline_length(&self.waypoints);
        self.current_waypoint = self.current_waypoint.min(self.waypoints.len());
    }
}

/// Capacity-bounded table of live paths.
pub struct PathStore {
    world: World,
    capacity: usize,
    waypoint_capacity: usize,
    scratch: Vec<Waypoint>,
}

impl PathStore {
    pub fn new(capacity: usize, waypoint_capacity: usize) -> Self {
        Self {
            world: World::new(),
            capacity: capacity.max(1),
            waypoint_capacity: waypoint_capacity.max(1),
            scratch: Vec::with_capacity(waypoint_capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_count(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_full(&self) -> bool {
        self.active_count() >= self.capacity
    }

    /// Snap both endpoints to cells, run A* and store the result.
    /// Failure never allocates a slot.
    pub fn find_path(
        &mut self,
        grid: &NavGrid,
        astar: &mut AStar,
        start: Vec2,
        goal: Vec2,
    ) -> NavResult<PathHandle> {
        if self.is_full() {
            return Err(NavError::PathTableFull {
                capacity: self.capacity,
            });
        }
        for p in [start, goal] {
            if !p.is_finite() {
                return Err(NavError::InvalidCoordinate { x: p.x, y: p.y });
            }
        }

        let start_cell = grid.world_to_grid(start.x, start.y);
        let goal_cell = grid.world_to_grid(goal.x, goal.y);

        let started = Instant::now();
        let report = astar.search(
            grid,
            start_cell,
            goal_cell,
            self.waypoint_capacity,
            &mut self.scratch,
        )?;
        let compute_time_ms = started.elapsed().as_secs_f32() * 1000.0;

        let waypoints = self.scratch.clone();
        let path = Path {
            length: polyline_length(&waypoints),
            waypoints,
            current_waypoint: 0,
            status: if report.is_partial() {
                PathStatus::Partial
            } else {
                PathStatus::Found
            },
            start: start_cell,
            goal: goal_cell,
            compute_time_ms,
            iterations: report.iterations,
        };
        Ok(self.insert(path))
    }

    fn insert(&mut self, path: Path) -> PathHandle {
        PathHandle::from_entity(self.world.spawn((path,)))
    }

    /// Drop the path; the handle is dead afterwards.
    pub fn cancel(&mut self, handle: PathHandle) -> bool {
        match handle.entity() {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.world.clear();
    }

    pub fn contains(&self, handle: PathHandle) -> bool {
        handle
            .entity()
            .map(|e| self.world.contains(e))
            .unwrap_or(false)
    }

    /// Run `f` against the path behind `handle`.
    pub fn with_path<R>(&self, handle: PathHandle, f: impl FnOnce(&Path) -> R) -> Option<R> {
        let entity = handle.entity()?;
        let path = self.world.get::<&Path>(entity).ok()?;
        Some(f(&path))
    }

    fn with_path_mut<R>(&self, handle: PathHandle, f: impl FnOnce(&mut Path) -> R) -> Option<R> {
        let entity = handle.entity()?;
        let mut path = self.world.get::<&mut Path>(entity).ok()?;
        Some(f(&mut path))
    }

    pub fn status(&self, handle: PathHandle) -> PathStatus {
        self.with_path(handle, |p| p.status)
            .unwrap_or(PathStatus::Failed)
    }

    pub fn waypoint_count(&self, handle: PathHandle) -> usize {
        self.with_path(handle, |p| p.waypoints.len()).unwrap_or(0)
    }

    pub fn waypoints(&self, handle: PathHandle) -> Vec<Waypoint> {
        self.with_path(handle, |p| p.waypoints.clone())
            .unwrap_or_default()
    }

    pub fn length(&self, handle: PathHandle) -> f32 {
        self.with_path(handle, |p| p.length).unwrap_or(0.0)
    }

    /// Waypoint under the cursor; the origin for unknown or finished paths.
    pub fn next_waypoint(&self, handle: PathHandle) -> Waypoint {
        self.with_path(handle, |p| p.next_waypoint())
            .flatten()
            .unwrap_or_default()
    }

    pub fn current_index(&self, handle: PathHandle) -> usize {
        self.with_path(handle, |p| p.current_waypoint).unwrap_or(0)
    }

    pub fn compute_time_ms(&self, handle: PathHandle) -> f32 {
        self.with_path(handle, |p| p.compute_time_ms)
            .unwrap_or(0.0)
    }

    /// Move the cursor forward. Returns `false` when already at the end.
    pub fn advance(&mut self, handle: PathHandle) -> bool {
        self.with_path_mut(handle, |p| {
            if p.current_waypoint < p.waypoints.len() {
                p.current_waypoint += 1;
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }

    pub fn rewind(&mut self, handle: PathHandle) -> bool {
        self.with_path_mut(handle, |p| p.current_waypoint = 0)
            .is_some()
    }

    pub fn smooth(
        &mut self,
        handle: PathHandle,
        grid: &NavGrid,
        smoother: &dyn PathSmoother,
    ) -> bool {
        self.with_path_mut(handle, |p| {
            smoother.smooth(grid, &mut p.waypoints);
            p.recompute();
        })
        .is_some()
    }

    pub fn simplify(
        &mut self,
        handle: PathHandle,
        grid: &NavGrid,
        max_deviation: f32,
        smoother: &dyn PathSmoother,
    ) -> bool {
        self.with_path_mut(handle, |p| {
            smoother.simplify(grid, &mut p.waypoints, max_deviation);
            p.recompute();
        })
        .is_some()
    }

    /// Live handles in table order.
    pub fn handles(&self) -> Vec<PathHandle> {
        self.world
            .iter()
            .map(|entity_ref| PathHandle::from_entity(entity_ref.entity()))
            .collect()
    }
}
