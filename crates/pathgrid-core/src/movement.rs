//! Unit table and the per-tick kinematic update.
//!
//! Units are entities in a private `hecs::World` carrying a [`UnitBody`]
//! (where the unit is) and a [`UnitDrive`] (where it wants to go and how
//! hard it may push). Caller-facing ids are mapped to entities through an
//! index, so a removed id can be registered again later.
//!
//! [`MovementSimulator::update`] reads a snapshot of every body taken at the
//! start of the tick and only writes results back once all units have been
//! processed, so pairwise forces never depend on iteration order.

use std::collections::HashMap;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::collision::{self, AgentView};
use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::formation::{Formation, FormationController, FormationType};
use crate::grid::NavGrid;
use crate::math::Vec2;
use crate::steering::{
    self, avoidance_force, default_behaviors, seek_force, Behavior, SteeringContext,
    WeightedBehavior,
};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementState {
    #[default]
    Idle = 0,
    Moving = 1,
    AtDestination = 2,
    Blocked = 3,
    /// Formation leader holding for stragglers.
    Waiting = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitBody {
    pub unit_id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

impl UnitBody {
    fn view(&self) -> AgentView {
        AgentView {
            unit_id: self.unit_id,
            position: self.position,
            velocity: self.velocity,
            radius: self.radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitDrive {
    pub desired_speed: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub target: Option<Vec2>,
    pub state: MovementState,
    /// Accumulated `apply_*` steering, consumed by the next update.
    pub pending_force: Vec2,
    /// Seconds spent without getting closer to the target.
    pub stall_time: f32,
}

impl UnitDrive {
    fn cruise_speed(&self) -> f32 {
        self.desired_speed.min(self.max_speed)
    }
}

/// Negative and non-finite kinematic inputs become 0.
fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Result of one unit's step, applied after every unit has been processed.
struct StepResult {
    entity: Entity,
    unit_id: u32,
    position: Vec2,
    velocity: Vec2,
    state: MovementState,
    stall_time: f32,
}

pub struct MovementSimulator {
    world: World,
    index: HashMap<u32, Entity>,
    capacity: usize,
    behaviors: Vec<WeightedBehavior>,
    external_weight: f32,
    arrival_epsilon: f32,
    blocked_timeout: f32,
    avoidance_range: f32,
    formations: FormationController,
}

impl MovementSimulator {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            capacity: config.max_units,
            behaviors: default_behaviors(&config.steering),
            external_weight: config.steering.external,
            arrival_epsilon: config.arrival_epsilon,
            blocked_timeout: config.blocked_timeout,
            avoidance_range: config.avoidance_range,
            formations: FormationController::new(
                config.formation_spacing,
                config.formation_max_lag,
            ),
        }
    }

    // ---- Unit table ----

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn unit_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, unit_id: u32) -> bool {
        self.index.contains_key(&unit_id)
    }

    /// Registered ids in ascending order.
    pub fn unit_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn add_unit(
        &mut self,
        unit_id: u32,
        position: Vec2,
        max_speed: f32,
        acceleration: f32,
        radius: f32,
    ) -> NavResult<()> {
        if self.index.contains_key(&unit_id) {
            return Err(NavError::DuplicateUnit(unit_id));
        }
        if self.index.len() >= self.capacity {
            log::warn!("unit table full, rejecting unit {}", unit_id);
            return Err(NavError::UnitTableFull {
                capacity: self.capacity,
            });
        }
        if !position.is_finite() {
            return Err(NavError::InvalidCoordinate {
                x: position.x,
                y: position.y,
            });
        }
        let max_speed = sanitize(max_speed);
        let entity = self.world.spawn((
            UnitBody {
                unit_id,
                position,
                velocity: Vec2::ZERO,
                radius: sanitize(radius),
            },
            UnitDrive {
                desired_speed: max_speed,
                max_speed,
                acceleration: sanitize(acceleration),
                target: None,
                state: MovementState::Idle,
                pending_force: Vec2::ZERO,
                stall_time: 0.0,
            },
        ));
        self.index.insert(unit_id, entity);
        Ok(())
    }

    /// Every unit's components, ordered by unit id.
    pub fn units(&self) -> Vec<(UnitBody, UnitDrive)> {
        let mut units: Vec<(UnitBody, UnitDrive)> = self
            .world
            .query::<(&UnitBody, &UnitDrive)>()
            .iter()
            .map(|(_, (b, d))| (*b, *d))
            .collect();
        units.sort_by_key(|(b, _)| b.unit_id);
        units
    }

    /// Re-register a unit with previously saved state.
    pub fn restore_unit(&mut self, body: UnitBody, drive: UnitDrive) -> NavResult<()> {
        self.add_unit(body.unit_id, body.position, drive.max_speed, drive.acceleration, body.radius)?;
        let entity = self.entity(body.unit_id)?;
        if let Ok(mut b) = self.world.get::<&mut UnitBody>(entity) {
            b.velocity = if body.velocity.is_finite() { body.velocity } else { Vec2::ZERO };
        }
        if let Ok(mut d) = self.world.get::<&mut UnitDrive>(entity) {
            d.desired_speed = sanitize(drive.desired_speed);
            d.target = drive.target.filter(Vec2::is_finite);
            d.state = drive.state;
            d.stall_time = sanitize(drive.stall_time);
        }
        if self.formations.active().is_none() {
            self.release_waiting(None);
        }
        Ok(())
    }

    /// Swap in the units held by `staged`, keeping this simulator's
    /// behaviors and formation spacing. The active formation is dropped
    /// and any waiting leader resumes.
    pub fn replace_units(&mut self, staged: MovementSimulator) {
        self.world = staged.world;
        self.index = staged.index;
        self.formations.disband();
        self.release_waiting(None);
    }

    /// Unregister a unit; it also leaves any formation.
    pub fn remove_unit(&mut self, unit_id: u32) -> bool {
        let Some(entity) = self.index.remove(&unit_id) else {
            return false;
        };
        self.formations.remove_member(unit_id);
        self.world.despawn(entity).is_ok()
    }

    pub fn clear(&mut self) {
        self.world.clear();
        self.index.clear();
        self.formations.disband();
    }

    fn entity(&self, unit_id: u32) -> NavResult<Entity> {
        self.index
            .get(&unit_id)
            .copied()
            .ok_or(NavError::UnknownUnit(unit_id))
    }

    fn with_drive<R>(&self, unit_id: u32, f: impl FnOnce(&mut UnitDrive) -> R) -> NavResult<R> {
        let entity = self.entity(unit_id)?;
        let mut drive = self
            .world
            .get::<&mut UnitDrive>(entity)
            .map_err(|_| NavError::UnknownUnit(unit_id))?;
        Ok(f(&mut drive))
    }

    fn with_body<R>(&self, unit_id: u32, f: impl FnOnce(&mut UnitBody) -> R) -> NavResult<R> {
        let entity = self.entity(unit_id)?;
        let mut body = self
            .world
            .get::<&mut UnitBody>(entity)
            .map_err(|_| NavError::UnknownUnit(unit_id))?;
        Ok(f(&mut body))
    }

    pub fn body(&self, unit_id: u32) -> Option<UnitBody> {
        self.with_body(unit_id, |b| *b).ok()
    }

    pub fn drive(&self, unit_id: u32) -> Option<UnitDrive> {
        self.with_drive(unit_id, |d| *d).ok()
    }

    // ---- Commands ----

    /// Start moving toward `target`. Clears the stall timer.
    pub fn set_target(&mut self, unit_id: u32, target: Vec2) -> NavResult<()> {
        if !target.is_finite() {
            return Err(NavError::InvalidCoordinate {
                x: target.x,
                y: target.y,
            });
        }
        self.with_drive(unit_id, |d| {
            d.target = Some(target);
            d.state = MovementState::Moving;
            d.stall_time = 0.0;
        })
    }

    /// Drop the target and stand still.
    pub fn stop(&mut self, unit_id: u32) -> NavResult<()> {
        self.with_drive(unit_id, |d| {
            d.target = None;
            d.state = MovementState::Idle;
            d.pending_force = Vec2::ZERO;
            d.stall_time = 0.0;
        })?;
        self.with_body(unit_id, |b| b.velocity = Vec2::ZERO)
    }

    pub fn set_speed(&mut self, unit_id: u32, speed: f32) -> NavResult<()> {
        self.with_drive(unit_id, |d| d.desired_speed = sanitize(speed))
    }

    pub fn set_max_speed(&mut self, unit_id: u32, max_speed: f32) -> NavResult<()> {
        self.with_drive(unit_id, |d| d.max_speed = sanitize(max_speed))
    }

    pub fn set_acceleration(&mut self, unit_id: u32, acceleration: f32) -> NavResult<()> {
        self.with_drive(unit_id, |d| d.acceleration = sanitize(acceleration))
    }

    pub fn set_radius(&mut self, unit_id: u32, radius: f32) -> NavResult<()> {
        self.with_body(unit_id, |b| b.radius = sanitize(radius))
    }

    // ---- Queries ----

    /// Unknown units report `Idle`.
    pub fn state(&self, unit_id: u32) -> MovementState {
        self.with_drive(unit_id, |d| d.state)
            .unwrap_or(MovementState::Idle)
    }

    pub fn position(&self, unit_id: u32) -> Option<Vec2> {
        self.with_body(unit_id, |b| b.position).ok()
    }

    pub fn velocity(&self, unit_id: u32) -> Option<Vec2> {
        self.with_body(unit_id, |b| b.velocity).ok()
    }

    pub fn speed(&self, unit_id: u32) -> f32 {
        self.velocity(unit_id).map(|v| v.length()).unwrap_or(0.0)
    }

    pub fn moving_count(&self) -> usize {
        self.world
            .query::<&UnitDrive>()
            .iter()
            .filter(|(_, d)| d.state == MovementState::Moving)
            .count()
    }

    /// All bodies as agent views, ordered by unit id.
    pub fn snapshot(&self) -> Vec<AgentView> {
        let mut views: Vec<AgentView> = self
            .world
            .query::<&UnitBody>()
            .iter()
            .map(|(_, b)| b.view())
            .collect();
        views.sort_by_key(|v| v.unit_id);
        views
    }

    /// Ids of other units within `radius` of `unit_id`, nearest first.
    pub fn nearby_units(&self, unit_id: u32, radius: f32, max_results: usize) -> Vec<u32> {
        let Some(me) = self.body(unit_id) else {
            return Vec::new();
        };
        collision::nearby(&me.view(), &self.snapshot(), sanitize(radius), max_results)
    }

    /// Velocity the unit would want after repulsion from its neighbours.
    /// Unknown ids get zero.
    pub fn avoid_collision(&self, unit_id: u32) -> Vec2 {
        let (Some(body), Some(drive)) = (self.body(unit_id), self.drive(unit_id)) else {
            return Vec2::ZERO;
        };
        let push = collision::separation_force(&body.view(), &self.snapshot(), self.avoidance_range);
        (body.velocity + push * drive.max_speed).truncate(drive.max_speed)
    }

    // ---- External steering ----

    /// Queue a push of `magnitude` along `(sx, sy)`.
    pub fn apply_steering(&mut self, unit_id: u32, direction: Vec2, magnitude: f32) -> NavResult<()> {
        if !direction.is_finite() || !magnitude.is_finite() {
            return Err(NavError::InvalidCoordinate {
                x: direction.x,
                y: direction.y,
            });
        }
        let push = direction.normalize() * magnitude;
        self.with_drive(unit_id, |d| d.pending_force += push)
    }

    pub fn apply_seek(&mut self, unit_id: u32, target: Vec2, max_force: f32) -> NavResult<()> {
        if !target.is_finite() {
            return Err(NavError::InvalidCoordinate {
                x: target.x,
                y: target.y,
            });
        }
        let body = self.with_body(unit_id, |b| *b)?;
        let max_speed = self.with_drive(unit_id, |d| d.max_speed)?;
        let push = seek_force(body.position, body.velocity, target, max_speed, sanitize(max_force));
        self.with_drive(unit_id, |d| d.pending_force += push)
    }

    pub fn apply_avoidance(&mut self, unit_id: u32, obstacles: &[Vec2], max_force: f32) -> NavResult<()> {
        let body = self.with_body(unit_id, |b| *b)?;
        let max_speed = self.with_drive(unit_id, |d| d.max_speed)?;
        let obstacles: Vec<Vec2> = obstacles.iter().copied().filter(Vec2::is_finite).collect();
        let push = avoidance_force(
            &body.view(),
            &obstacles,
            self.avoidance_range,
            max_speed,
            sanitize(max_force),
        );
        self.with_drive(unit_id, |d| d.pending_force += push)
    }

    // ---- Behaviors ----

    pub fn behaviors(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.behaviors.iter().map(|b| (b.behavior.name(), b.weight))
    }

    /// Append a custom behavior to the steering sum.
    pub fn add_behavior(&mut self, weight: f32, behavior: Box<dyn Behavior>) {
        log::debug!("steering behavior {} added (weight {})", behavior.name(), weight);
        self.behaviors.push(WeightedBehavior::new(weight, behavior));
    }

    // ---- Formations ----

    pub fn formation(&self) -> Option<&Formation> {
        self.formations.active()
    }

    pub fn formation_spacing(&self, kind: FormationType) -> f32 {
        self.formations.spacing(kind)
    }

    /// Group the given units; ids that are not registered are dropped and
    /// the first remaining one leads. Returns the leader id.
    pub fn create_formation(&mut self, kind: FormationType, unit_ids: &[u32]) -> NavResult<u32> {
        let known: Vec<u32> = unit_ids
            .iter()
            .copied()
            .filter(|id| self.index.contains_key(id))
            .collect();
        let leader = self.formations.create(kind, &known)?.leader();
        self.release_waiting(Some(leader));
        Ok(leader)
    }

    /// Send the leader to `target` and each follower to its slot there.
    pub fn move_formation(&mut self, leader: u32, target: Vec2) -> NavResult<()> {
        if !target.is_finite() {
            return Err(NavError::InvalidCoordinate {
                x: target.x,
                y: target.y,
            });
        }
        let leader_position = self.position(leader).ok_or(NavError::UnknownUnit(leader))?;
        let plan = self.formations.plan_move(leader, leader_position, target)?;
        for (unit_id, slot) in plan {
            self.set_target(unit_id, slot)?;
        }
        Ok(())
    }

    pub fn set_formation_spacing(&mut self, kind: FormationType, spacing: f32) -> NavResult<()> {
        self.formations.set_spacing(kind, spacing)
    }

    /// Dissolve the active formation. A waiting leader resumes.
    pub fn disband_formation(&mut self) -> bool {
        if self.formations.disband().is_none() {
            return false;
        }
        self.release_waiting(None);
        true
    }

    /// Put every `Waiting` unit other than `keep` back to `Moving`.
    fn release_waiting(&mut self, keep: Option<u32>) {
        for (_, (body, drive)) in self.world.query_mut::<(&UnitBody, &mut UnitDrive)>() {
            if drive.state == MovementState::Waiting && Some(body.unit_id) != keep {
                log::trace!("unit {} no longer waiting", body.unit_id);
                drive.state = MovementState::Moving;
            }
        }
    }

    /// Follower slots around the leader's current position, and whether
    /// the leader should hold for a trailing follower.
    fn formation_slots(&self, snapshot: &[AgentView]) -> (HashMap<u32, Vec2>, Option<(u32, bool)>) {
        let Some(formation) = self.formations.active() else {
            return (HashMap::new(), None);
        };
        let leader = formation.leader();
        let Some(anchor) = snapshot.iter().find(|v| v.unit_id == leader) else {
            return (HashMap::new(), None);
        };
        let forward = match formation.heading.normalize() {
            v if v == Vec2::ZERO => Vec2::new(1.0, 0.0),
            v => v,
        };
        let limit = self.formations.lag_limit();

        let mut slots = HashMap::new();
        let mut trailing = false;
        for (unit_id, slot) in self.formations.slot_positions(anchor.position).into_iter().skip(1) {
            let Some(view) = snapshot.iter().find(|v| v.unit_id == unit_id) else {
                continue;
            };
            let catching_up = self.drive(unit_id).map_or(false, |d| {
                d.state == MovementState::Moving && d.cruise_speed() > 0.0 && d.acceleration > 0.0
            });
            if catching_up {
                // Only distance behind the slot counts; followers ahead never hold the leader.
                let behind = (slot - view.position).dot(&forward);
                trailing |= behind > limit;
            }
            slots.insert(unit_id, slot);
        }
        (slots, Some((leader, trailing)))
    }

    // ---- Tick ----

    /// Advance every unit by `dt` seconds. Non-positive or non-finite `dt`
    /// does nothing.
    pub fn update(&mut self, dt: f32, grid: &NavGrid) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let snapshot = self.snapshot();
        let (slots, leader_hold) = self.formation_slots(&snapshot);
        self.release_waiting(leader_hold.map(|(leader, _)| leader));

        if let Some((leader, trailing)) = leader_hold {
            // The leader came from the snapshot, so it is registered.
            if let Err(err) = self.with_drive(leader, |d| match (d.state, trailing) {
                (MovementState::Moving, true) => d.state = MovementState::Waiting,
                (MovementState::Waiting, false) => d.state = MovementState::Moving,
                _ => {}
            }) {
                log::warn!("formation leader lookup failed: {}", err);
            }
        }

        let mut results: Vec<StepResult> = Vec::with_capacity(snapshot.len());
        for view in &snapshot {
            let Some(&entity) = self.index.get(&view.unit_id) else {
                continue;
            };
            let Some(drive) = self.drive(view.unit_id) else {
                continue;
            };
            let ctx = SteeringContext {
                agent: *view,
                target: drive.target,
                slot: slots.get(&view.unit_id).copied(),
                cruise_speed: drive.cruise_speed(),
                max_speed: drive.max_speed,
                acceleration: drive.acceleration,
                neighbors: &snapshot,
                avoidance_range: self.avoidance_range,
                dt,
            };
            results.push(self.step_unit(entity, &ctx, &drive, grid));
        }

        // Apply updates
        for r in results {
            if let Ok(mut body) = self.world.get::<&mut UnitBody>(r.entity) {
                body.position = r.position;
                body.velocity = r.velocity;
            }
            if let Ok(mut drive) = self.world.get::<&mut UnitDrive>(r.entity) {
                if drive.state != r.state {
                    log::trace!("unit {} -> {:?}", r.unit_id, r.state);
                }
                drive.state = r.state;
                drive.stall_time = r.stall_time;
                drive.pending_force = Vec2::ZERO;
            }
        }
    }

    fn step_unit(
        &self,
        entity: Entity,
        ctx: &SteeringContext<'_>,
        drive: &UnitDrive,
        grid: &NavGrid,
    ) -> StepResult {
        let view = ctx.agent;
        let hold = StepResult {
            entity,
            unit_id: view.unit_id,
            position: view.position,
            velocity: Vec2::ZERO,
            state: drive.state,
            stall_time: drive.stall_time,
        };

        match drive.state {
            MovementState::Moving => {}
            // Everything else holds position
            _ => return hold,
        }
        let Some(target) = drive.target else {
            return StepResult {
                state: MovementState::Idle,
                ..hold
            };
        };

        let to_target = target - view.position;
        let distance = to_target.length();
        if distance <= self.arrival_epsilon {
            return StepResult {
                position: target,
                state: MovementState::AtDestination,
                stall_time: 0.0,
                ..hold
            };
        }

        let mut delta = steering::combine(&self.behaviors, ctx);
        if drive.pending_force.is_finite() {
            delta += drive.pending_force * self.external_weight;
        }
        let delta = delta.truncate(drive.acceleration * ctx.dt);
        let velocity = (view.velocity + delta).truncate(drive.max_speed);
        let step = velocity * ctx.dt;

        // Passing the target this tick counts as arriving.
        if step.dot(&to_target) >= to_target.length_squared() {
            return StepResult {
                position: target,
                state: MovementState::AtDestination,
                stall_time: 0.0,
                ..hold
            };
        }

        let mut next = view.position + step;
        let mut velocity = velocity;
        let inside = self.in_bounds(grid, view.position);
        let here_ok = !inside || grid.is_world_walkable(view.position.x, view.position.y);
        let enters_wall = self.in_bounds(grid, next) && !grid.is_world_walkable(next.x, next.y);
        let leaves_grid = inside && !self.in_bounds(grid, next);
        // Stepping into a blocked cell or off the grid is refused; a unit
        // already on a blocked cell may leave, and units outside roam freely.
        if here_ok && (enters_wall || leaves_grid) {
            next = view.position;
            velocity = Vec2::ZERO;
        }

        let progressed = next.distance(&target) < distance - 1e-4;
        let trying = drive.cruise_speed() > 0.0 && drive.acceleration > 0.0;
        let stall_time = if progressed || !trying {
            0.0
        } else {
            drive.stall_time + ctx.dt
        };

        if stall_time >= self.blocked_timeout {
            log::debug!("unit {} blocked after {:.2}s without progress", view.unit_id, stall_time);
            return StepResult {
                state: MovementState::Blocked,
                stall_time,
                ..hold
            };
        }

        StepResult {
            entity,
            unit_id: view.unit_id,
            position: next,
            velocity,
            state: MovementState::Moving,
            stall_time,
        }
    }

    fn in_bounds(&self, grid: &NavGrid, p: Vec2) -> bool {
        let w = grid.width() as f32 * grid.cell_size();
        let h = grid.height() as f32 * grid.cell_size();
        p.x >= 0.0 && p.y >= 0.0 && p.x < w && p.y < h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> MovementSimulator {
        MovementSimulator::new(&NavConfig::default())
    }

    fn open_grid() -> NavGrid {
        NavGrid::with_dimensions(64, 64, 2.0).unwrap()
    }

    #[test]
    fn test_add_and_remove() {
        let mut s = sim();
        s.add_unit(7, Vec2::new(1.0, 1.0), 5.0, 2.0, 0.5).unwrap();
        assert_eq!(s.unit_count(), 1);
        assert_eq!(s.add_unit(7, Vec2::ZERO, 1.0, 1.0, 1.0), Err(NavError::DuplicateUnit(7)));
        assert_eq!(s.drive(7).unwrap().desired_speed, 5.0);
        assert!(s.remove_unit(7));
        assert!(!s.remove_unit(7));
        assert_eq!(s.state(7), MovementState::Idle);
        // Id can come back
        s.add_unit(7, Vec2::ZERO, 1.0, 1.0, 1.0).unwrap();
    }

    #[test]
    fn test_capacity_enforced() {
        let config = NavConfig {
            max_units: 2,
            ..NavConfig::default()
        };
        let mut s = MovementSimulator::new(&config);
        s.add_unit(1, Vec2::ZERO, 1.0, 1.0, 1.0).unwrap();
        s.add_unit(2, Vec2::ZERO, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(
            s.add_unit(3, Vec2::ZERO, 1.0, 1.0, 1.0),
            Err(NavError::UnitTableFull { capacity: 2 })
        );
    }

    #[test]
    fn test_negative_inputs_clamped() {
        let mut s = sim();
        s.add_unit(1, Vec2::ZERO, -5.0, -1.0, -2.0).unwrap();
        let d = s.drive(1).unwrap();
        assert_eq!(d.max_speed, 0.0);
        assert_eq!(d.acceleration, 0.0);
        assert_eq!(s.body(1).unwrap().radius, 0.0);
        s.set_speed(1, -3.0).unwrap();
        assert_eq!(s.drive(1).unwrap().desired_speed, 0.0);
    }

    #[test]
    fn test_speed_ramp_2_4_5_5() {
        let grid = open_grid();
        let mut s = sim();
        s.add_unit(1, Vec2::new(1.0, 1.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(120.0, 1.0)).unwrap();
        let mut speeds = Vec::new();
        for _ in 0..4 {
            s.update(1.0, &grid);
            speeds.push(s.speed(1));
        }
        for (got, want) in speeds.iter().zip([2.0, 4.0, 5.0, 5.0]) {
            assert!((got - want).abs() < 1e-4, "speeds {:?}", speeds);
        }
        assert_eq!(s.state(1), MovementState::Moving);
        assert!((s.position(1).unwrap().x - 17.0).abs() < 1e-3);
    }

    #[test]
    fn test_arrives_without_overshoot() {
        let grid = open_grid();
        let mut s = sim();
        s.add_unit(1, Vec2::new(1.0, 1.0), 5.0, 2.0, 0.5).unwrap();
        let target = Vec2::new(9.0, 1.0);
        s.set_target(1, target).unwrap();
        for _ in 0..20 {
            s.update(0.5, &grid);
            assert!(s.position(1).unwrap().x <= target.x + 1e-4);
        }
        assert_eq!(s.state(1), MovementState::AtDestination);
        assert_eq!(s.position(1), Some(target));
        assert_eq!(s.speed(1), 0.0);
    }

    #[test]
    fn test_bad_dt_is_noop() {
        let grid = open_grid();
        let mut s = sim();
        s.add_unit(1, Vec2::new(1.0, 1.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(50.0, 1.0)).unwrap();
        s.update(0.0, &grid);
        s.update(-1.0, &grid);
        s.update(f32::NAN, &grid);
        assert_eq!(s.position(1), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_wall_blocks_unit() {
        let mut grid = open_grid();
        // Wall across the whole height at cell x=3
        grid.fill_rect(3, 0, 3, 63, false);
        let mut s = sim();
        s.add_unit(1, Vec2::new(3.0, 10.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(20.0, 10.0)).unwrap();
        for _ in 0..20 {
            s.update(0.25, &grid);
        }
        assert_eq!(s.state(1), MovementState::Blocked);
        assert!(s.position(1).unwrap().x < 6.0);
        // A new target resumes movement
        s.set_target(1, Vec2::new(1.0, 10.0)).unwrap();
        assert_eq!(s.state(1), MovementState::Moving);
    }

    #[test]
    fn test_units_repel() {
        let grid = open_grid();
        let mut s = sim();
        s.add_unit(1, Vec2::new(10.0, 10.0), 5.0, 2.0, 1.0).unwrap();
        s.add_unit(2, Vec2::new(10.5, 10.0), 5.0, 2.0, 1.0).unwrap();
        let v = s.avoid_collision(1);
        assert!(v.x < 0.0);
        assert_eq!(s.avoid_collision(99), Vec2::ZERO);
        assert_eq!(s.nearby_units(1, 2.0, 8), vec![2]);
        assert!(s.nearby_units(99, 2.0, 8).is_empty());
        // Idle units hold position even when overlapping
        s.update(1.0, &grid);
        assert_eq!(s.position(1), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn test_external_steering_consumed() {
        let grid = open_grid();
        let mut s = sim();
        s.add_unit(1, Vec2::new(10.0, 10.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(10.0, 60.0)).unwrap();
        s.apply_steering(1, Vec2::new(1.0, 0.0), 10.0).unwrap();
        assert_eq!(s.drive(1).unwrap().pending_force, Vec2::new(10.0, 0.0));
        s.update(0.5, &grid);
        assert!(s.velocity(1).unwrap().x > 0.0);
        assert_eq!(s.drive(1).unwrap().pending_force, Vec2::ZERO);
        assert_eq!(
            s.apply_seek(42, Vec2::ZERO, 1.0),
            Err(NavError::UnknownUnit(42))
        );
        let p = s.position(1).unwrap();
        s.apply_avoidance(1, &[Vec2::new(p.x + 0.5, p.y)], 2.0).unwrap();
        assert!(s.drive(1).unwrap().pending_force.x < 0.0);
    }

    #[test]
    fn test_formation_move_assigns_slots() {
        let mut s = sim();
        for id in 1..=3 {
            s.add_unit(id, Vec2::new(10.0, 10.0 + id as f32), 5.0, 2.0, 0.5).unwrap();
        }
        let leader = s.create_formation(FormationType::Column, &[1, 99, 2, 3]).unwrap();
        assert_eq!(leader, 1);
        assert_eq!(s.formation().unwrap().members, vec![1, 2, 3]);
        s.move_formation(1, Vec2::new(40.0, 11.0)).unwrap();
        let t2 = s.drive(2).unwrap().target.unwrap();
        let t3 = s.drive(3).unwrap().target.unwrap();
        assert!((t2.x - 37.0).abs() < 1e-4);
        assert!((t3.x - 34.0).abs() < 1e-4);
        assert_eq!(s.move_formation(2, Vec2::ZERO), Err(NavError::NotFormationLeader(2)));
        assert!(s.disband_formation());
        assert!(!s.disband_formation());
        assert_eq!(s.move_formation(1, Vec2::ZERO), Err(NavError::NoFormation));
    }

    /// Leader at x=30 heading for x=100 with a column follower at x=2.
    fn straggling_column(follower_speed: f32, follower_accel: f32) -> MovementSimulator {
        let mut s = sim();
        s.add_unit(1, Vec2::new(30.0, 10.0), 5.0, 2.0, 0.5).unwrap();
        s.add_unit(2, Vec2::new(2.0, 10.0), follower_speed, follower_accel, 0.5)
            .unwrap();
        s.create_formation(FormationType::Column, &[1, 2]).unwrap();
        s.move_formation(1, Vec2::new(100.0, 10.0)).unwrap();
        s
    }

    #[test]
    fn test_leader_waits_for_straggler() {
        let grid = open_grid();
        let mut s = straggling_column(5.0, 5.0);
        s.update(0.1, &grid);
        assert_eq!(s.state(1), MovementState::Waiting);

        let mut released = false;
        for _ in 0..300 {
            s.update(0.1, &grid);
            if s.state(1) == MovementState::Moving {
                released = true;
                break;
            }
        }
        assert!(released, "leader never resumed");
        assert!(s.position(2).unwrap().x > 20.0);
    }

    #[test]
    fn test_disband_releases_waiting_leader() {
        let grid = open_grid();
        let mut s = straggling_column(5.0, 5.0);
        s.update(0.1, &grid);
        assert_eq!(s.state(1), MovementState::Waiting);
        assert!(s.disband_formation());
        assert_eq!(s.state(1), MovementState::Moving);
    }

    #[test]
    fn test_immobile_follower_never_holds_leader() {
        let grid = open_grid();
        let mut s = straggling_column(0.0, 0.0);
        for _ in 0..400 {
            s.update(0.1, &grid);
            assert_ne!(s.state(1), MovementState::Waiting);
        }
        assert_eq!(s.state(1), MovementState::AtDestination);
        assert_eq!(s.position(1), Some(Vec2::new(100.0, 10.0)));
    }

    #[test]
    fn test_replaced_formation_releases_old_leader() {
        let grid = open_grid();
        let mut s = straggling_column(5.0, 5.0);
        s.add_unit(3, Vec2::new(60.0, 40.0), 5.0, 2.0, 0.5).unwrap();
        s.update(0.1, &grid);
        assert_eq!(s.state(1), MovementState::Waiting);
        let x = s.position(1).unwrap().x;

        assert_eq!(s.create_formation(FormationType::Line, &[3]), Ok(3));
        assert_eq!(s.state(1), MovementState::Moving);
        for _ in 0..50 {
            s.update(0.1, &grid);
        }
        assert_ne!(s.state(1), MovementState::Waiting);
        assert!(s.position(1).unwrap().x > x + 5.0);
    }

    #[test]
    fn test_restore_without_formation_resumes_waiting_leader() {
        let grid = open_grid();
        let mut s = straggling_column(5.0, 5.0);
        s.update(0.1, &grid);
        let (body, drive) = s
            .units()
            .into_iter()
            .find(|(b, _)| b.unit_id == 1)
            .unwrap();
        assert_eq!(drive.state, MovementState::Waiting);

        let mut fresh = sim();
        fresh.restore_unit(body, drive).unwrap();
        assert_eq!(fresh.state(1), MovementState::Moving);
        fresh.update(0.1, &grid);
        assert!(fresh.position(1).unwrap().x > body.position.x);
    }

    #[test]
    fn test_unit_outside_grid_moves_freely() {
        let grid = NavGrid::with_dimensions(10, 10, 1.0).unwrap();
        let mut s = sim();
        s.add_unit(1, Vec2::new(50.0, 5.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(60.0, 5.0)).unwrap();
        for _ in 0..10 {
            s.update(0.5, &grid);
        }
        assert_eq!(s.state(1), MovementState::AtDestination);
        assert_eq!(s.position(1), Some(Vec2::new(60.0, 5.0)));
    }

    #[test]
    fn test_unit_cannot_leave_grid() {
        let grid = NavGrid::with_dimensions(10, 10, 1.0).unwrap();
        let mut s = sim();
        s.add_unit(1, Vec2::new(8.5, 5.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(30.0, 5.0)).unwrap();
        for _ in 0..20 {
            s.update(0.25, &grid);
        }
        assert!(s.position(1).unwrap().x < 10.0);
        assert_eq!(s.state(1), MovementState::Blocked);
    }

    #[test]
    fn test_custom_behavior_added() {
        struct Drift;
        impl Behavior for Drift {
            fn name(&self) -> &'static str {
                "drift"
            }
            fn force(&self, _ctx: &SteeringContext<'_>) -> Vec2 {
                Vec2::new(0.0, 1.0)
            }
        }
        let grid = open_grid();
        let mut s = sim();
        s.add_behavior(1.0, Box::new(Drift));
        assert!(s.behaviors().any(|(name, _)| name == "drift"));
        s.add_unit(1, Vec2::new(10.0, 10.0), 5.0, 2.0, 0.5).unwrap();
        s.set_target(1, Vec2::new(60.0, 10.0)).unwrap();
        s.update(0.5, &grid);
        assert!(s.velocity(1).unwrap().y > 0.0);
    }
}
