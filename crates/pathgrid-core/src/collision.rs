//! Circle-circle collision tests and pairwise repulsion.
//!
//! [`check_collision`] is the single overlap test; every range check in
//! avoidance and neighbour queries goes through it.

use crate::math::Vec2;

/// Read-only view of a unit, taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub unit_id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

/// Exact overlap test: `distance² < (r1 + r2)²`.
pub fn check_collision(x1: f32, y1: f32, radius1: f32, x2: f32, y2: f32, radius2: f32) -> bool {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let min_dist = radius1 + radius2;
    dx * dx + dy * dy < min_dist * min_dist
}

pub fn agents_overlap(a: &AgentView, b: &AgentView) -> bool {
    check_collision(
        a.position.x,
        a.position.y,
        a.radius,
        b.position.x,
        b.position.y,
        b.radius,
    )
}

/// Sum of unit-length pushes away from neighbours whose radii, scaled by
/// `range`, overlap the agent's. Each push fades linearly from 1 (touching
/// centres) to 0 (edge of range). Coincident agents split along x by id.
pub fn separation_force(agent: &AgentView, neighbors: &[AgentView], range: f32) -> Vec2 {
    let mut force = Vec2::ZERO;
    for other in neighbors {
        if other.unit_id == agent.unit_id {
            continue;
        }
        let (p, q) = (agent.position, other.position);
        if !check_collision(p.x, p.y, agent.radius * range, q.x, q.y, other.radius * range) {
            continue;
        }
        let reach = (agent.radius + other.radius) * range;
        let away = p - q;
        let dist = away.length();
        let dir = if dist > 1e-6 {
            away * (1.0 / dist)
        } else if agent.unit_id < other.unit_id {
            Vec2::new(-1.0, 0.0)
        } else {
            Vec2::new(1.0, 0.0)
        };
        let strength = if reach > 0.0 {
            (1.0 - dist / reach).clamp(0.0, 1.0)
        } else {
            1.0
        };
        force += dir * strength;
    }
    force
}

/// Push away from fixed obstacle points, treating each as a body of the
/// agent's own radius.
pub fn obstacle_repulsion(agent: &AgentView, obstacles: &[Vec2], range: f32) -> Vec2 {
    let views: Vec<AgentView> = obstacles
        .iter()
        .map(|&position| AgentView {
            // Never equal to the agent id, so no obstacle is skipped.
            unit_id: agent.unit_id.wrapping_add(1),
            position,
            velocity: Vec2::ZERO,
            radius: agent.radius,
        })
        .collect();
    separation_force(agent, &views, range)
}

/// Ids of agents within `search_radius` of `agent` (touching their body),
/// nearest first, ties by id, at most `max_results`.
pub fn nearby(
    agent: &AgentView,
    others: &[AgentView],
    search_radius: f32,
    max_results: usize,
) -> Vec<u32> {
    let p = agent.position;
    let mut hits: Vec<(f32, u32)> = others
        .iter()
        .filter(|o| o.unit_id != agent.unit_id)
        .filter(|o| {
            check_collision(
                p.x,
                p.y,
                search_radius,
                o.position.x,
                o.position.y,
                o.radius,
            )
        })
        .map(|o| (p.distance_squared(&o.position), o.unit_id))
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    hits.into_iter().take(max_results).map(|(_, id)| id).collect()
}

/// Number of overlapping pairs (diagnostics).
pub fn overlapping_pairs(agents: &[AgentView]) -> usize {
    let mut count = 0;
    for (i, a) in agents.iter().enumerate() {
        for b in &agents[i + 1..] {
            if agents_overlap(a, b) {
                count += 1;
            }
        }
    }
    count
}
