//! Steering behaviors.
//!
//! A [`Behavior`] turns a [`SteeringContext`] into a force, expressed as the
//! velocity change the behavior would like this tick. The simulator sums
//! `weight * force` over its behaviors, then limits the total to
//! `acceleration * dt` before integrating.
//!
//! Shipped behaviors: [`Seek`] (arrive at the target), [`Separation`]
//! (collision avoidance) and [`FormationKeeping`]. [`Inert`] is the no-op
//! default for the trait.

use crate::collision::{obstacle_repulsion, separation_force, AgentView};
use crate::config::SteeringWeights;
use crate::math::Vec2;

/// Everything a behavior may look at for one unit on one tick.
#[derive(Debug, Clone, Copy)]
pub struct SteeringContext<'a> {
    pub agent: AgentView,
    pub target: Option<Vec2>,
    /// Current slot relative to the formation leader, for followers.
    pub slot: Option<Vec2>,
    /// `min(desired_speed, max_speed)`.
    pub cruise_speed: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    /// Snapshot of every unit at the start of the tick (may include `agent`).
    pub neighbors: &'a [AgentView],
    pub avoidance_range: f32,
    pub dt: f32,
}

pub trait Behavior: Send + Sync {
    fn name(&self) -> &'static str;

    fn force(&self, _ctx: &SteeringContext<'_>) -> Vec2 {
        Vec2::ZERO
    }
}

/// A behavior and its weight in the sum.
pub struct WeightedBehavior {
    pub weight: f32,
    pub behavior: Box<dyn Behavior>,
}

impl WeightedBehavior {
    pub fn new(weight: f32, behavior: Box<dyn Behavior>) -> Self {
        Self { weight, behavior }
    }
}

/// The built-in behavior stack for the given weights.
pub fn default_behaviors(weights: &SteeringWeights) -> Vec<WeightedBehavior> {
    vec![
        WeightedBehavior::new(weights.seek, Box::new(Seek)),
        WeightedBehavior::new(weights.avoidance, Box::new(Separation)),
        WeightedBehavior::new(weights.formation, Box::new(FormationKeeping)),
    ]
}

/// Weighted sum of every behavior's force.
pub fn combine(behaviors: &[WeightedBehavior], ctx: &SteeringContext<'_>) -> Vec2 {
    behaviors.iter().fold(Vec2::ZERO, |acc, wb| {
        if wb.weight == 0.0 {
            return acc;
        }
        let f = wb.behavior.force(ctx);
        if f.is_finite() {
            acc + f * wb.weight
        } else {
            acc
        }
    })
}

/// Velocity that reaches `target` at `speed` but brakes in time to stop
/// there: `min(speed, sqrt(2 * accel * distance))`.
pub fn arrive_velocity(position: Vec2, target: Vec2, speed: f32, acceleration: f32) -> Vec2 {
    let to_target = target - position;
    let distance = to_target.length();
    if distance < 1e-6 || speed <= 0.0 {
        return Vec2::ZERO;
    }
    let braking = if acceleration > 0.0 {
        (2.0 * acceleration * distance).sqrt()
    } else {
        speed
    };
    to_target * (speed.min(braking) / distance)
}

/// Classic seek: full-speed desired velocity minus current velocity,
/// capped at `max_force`.
pub fn seek_force(position: Vec2, velocity: Vec2, target: Vec2, max_speed: f32, max_force: f32) -> Vec2 {
    if max_force <= 0.0 || max_speed <= 0.0 {
        return Vec2::ZERO;
    }
    let desired = (target - position).normalize() * max_speed;
    (desired - velocity).truncate(max_force)
}

/// Repulsion from obstacle points scaled to `max_speed`, capped at
/// `max_force`.
pub fn avoidance_force(
    agent: &AgentView,
    obstacles: &[Vec2],
    range: f32,
    max_speed: f32,
    max_force: f32,
) -> Vec2 {
    if max_force <= 0.0 {
        return Vec2::ZERO;
    }
    (obstacle_repulsion(agent, obstacles, range) * max_speed.max(1.0)).truncate(max_force)
}

/// Does nothing; the default [`Behavior`] body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inert;

impl Behavior for Inert {
    fn name(&self) -> &'static str {
        "inert"
    }
}

/// Head for the target, braking to stop on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Seek;

impl Behavior for Seek {
    fn name(&self) -> &'static str {
        "seek"
    }

    fn force(&self, ctx: &SteeringContext<'_>) -> Vec2 {
        match ctx.target {
            Some(target) => {
                arrive_velocity(ctx.agent.position, target, ctx.cruise_speed, ctx.acceleration)
                    - ctx.agent.velocity
            }
            None => Vec2::ZERO,
        }
    }
}

/// Push away from neighbours inside the avoidance range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Separation;

impl Behavior for Separation {
    fn name(&self) -> &'static str {
        "separation"
    }

    fn force(&self, ctx: &SteeringContext<'_>) -> Vec2 {
        separation_force(&ctx.agent, ctx.neighbors, ctx.avoidance_range) * ctx.max_speed
    }
}

/// Hold the slot relative to the formation leader: a nudge toward the
/// slot, zero when on station, so it corrects drift without fighting
/// [`Seek`] for the cruise speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormationKeeping;

impl Behavior for FormationKeeping {
    fn name(&self) -> &'static str {
        "formation"
    }

    fn force(&self, ctx: &SteeringContext<'_>) -> Vec2 {
        match ctx.slot {
            Some(slot) => arrive_velocity(ctx.agent.position, slot, ctx.max_speed, ctx.acceleration),
            None => Vec2::ZERO,
        }
    }
}
