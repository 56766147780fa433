//! Bounded-iteration A* over a [`NavGrid`].
//!
//! Algorithm:
//! 1. Seed the open list with the start cell (`g = 0`, `h` = Euclidean
//!    distance to the goal in cells).
//! 2. Each iteration scans the whole open list for the lowest `f = g + h`.
//!    The scan uses strict `<`, so the earliest-inserted node wins a tie and
//!    repeated searches on the same grid return the same route.
//! 3. Expand the 8 neighbours. A step costs 1.0 (orthogonal) or 1.414
//!    (diagonal) times the destination cell's cost.
//! 4. A closed cell is only reopened by a strictly cheaper `g`.
//! 5. Stop at the goal, on an empty open list, or at the iteration cap.
//!
//! Open/closed bookkeeping lives in scratch buffers owned by [`AStar`];
//! they are reset at the start of every search, so nothing carries over.

use crate::error::{NavError, NavResult};
use crate::grid::{GridPos, NavGrid};
use crate::path::Waypoint;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000;

const NO_PARENT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct AStarNode {
    pos: GridPos,
    g_cost: f32,
    h_cost: f32,
    f_cost: f32,
    parent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellState {
    Unseen,
    Open { g_cost: f32 },
    Closed { g_cost: f32 },
}

/// Summary of a successful search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchReport {
    /// Expansions performed.
    pub iterations: u32,
    /// The goal was reached (false for an iteration-cap clip).
    pub reached_goal: bool,
    /// The route was longer than the waypoint capacity and was cut.
    pub truncated: bool,
    /// Accumulated `g` cost of the end cell.
    pub route_cost: f32,
}

impl SearchReport {
    /// Either clip makes the stored path `Partial`.
    pub fn is_partial(&self) -> bool {
        !self.reached_goal || self.truncated
    }
}

/// Reusable A* solver with scratch open/closed storage.
#[derive(Debug, Clone)]
pub struct AStar {
    max_iterations: u32,
    allow_partial: bool,
    open: Vec<AStarNode>,
    states: Vec<CellState>,
    parents: Vec<u32>,
}

impl Default for AStar {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl AStar {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            allow_partial: false,
            open: Vec::new(),
            states: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) {
        self.max_iterations = max_iterations.max(1);
    }

    /// When enabled, hitting the iteration cap returns the route to the
    /// closed cell nearest the goal instead of failing.
    pub fn set_allow_partial(&mut self, allow: bool) {
        self.allow_partial = allow;
    }

    fn reset(&mut self, cell_count: usize) {
        self.open.clear();
        self.states.clear();
        self.states.resize(cell_count, CellState::Unseen);
        self.parents.clear();
        self.parents.resize(cell_count, NO_PARENT);
    }

    /// Search from `start` to `goal`, writing at most `capacity` waypoints
    /// (cell centres, start first) into `out`.
    pub fn search(
        &mut self,
        grid: &NavGrid,
        start: GridPos,
        goal: GridPos,
        capacity: usize,
        out: &mut Vec<Waypoint>,
    ) -> NavResult<SearchReport> {
        out.clear();
        if capacity == 0 {
            return Err(NavError::ZeroWaypointCapacity);
        }
        if !grid.contains(start.x as i64, start.y as i64) {
            return Err(NavError::InvalidCoordinate {
                x: start.x as f32,
                y: start.y as f32,
            });
        }
        if !grid.is_walkable(goal.x, goal.y) {
            return Err(NavError::GoalNotWalkable {
                x: goal.x,
                y: goal.y,
            });
        }
        if grid.regions_fresh() {
            let start_region = grid.region_id(start.x, start.y);
            let goal_region = grid.region_id(goal.x, goal.y);
            if start_region != 0 && start_region != goal_region {
                return Err(NavError::DisconnectedRegions {
                    start: start_region,
                    goal: goal_region,
                });
            }
        }

        let width = grid.width();
        let index = |p: GridPos| (p.y * width + p.x) as usize;
        self.reset(grid.cell_count());

        let start_h = start.distance(&goal);
        self.open.push(AStarNode {
            pos: start,
            g_cost: 0.0,
            h_cost: start_h,
            f_cost: start_h,
            parent: NO_PARENT,
        });
        self.states[index(start)] = CellState::Open { g_cost: 0.0 };

        let mut iterations = 0u32;
        let mut end: Option<(GridPos, f32)> = None;
        let mut closest = (start, start_h, 0.0f32);

        while !self.open.is_empty() && iterations < self.max_iterations {
            iterations += 1;

            let mut current_idx = 0;
            for i in 1..self.open.len() {
                if self.open[i].f_cost < self.open[current_idx].f_cost {
                    current_idx = i;
                }
            }
            let current = self.open.remove(current_idx);
            let ci = index(current.pos);
            self.parents[ci] = current.parent;

            if current.pos == goal {
                end = Some((current.pos, current.g_cost));
                break;
            }

            self.states[ci] = CellState::Closed {
                g_cost: current.g_cost,
            };
            if current.h_cost < closest.1 {
                closest = (current.pos, current.h_cost, current.g_cost);
            }

            for (next, step) in grid.walkable_neighbors(current.pos) {
                let ni = index(next);
                let g_cost = current.g_cost + step * grid.cost(next.x, next.y) as f32;

                match self.states[ni] {
                    CellState::Closed { g_cost: closed_g } if g_cost >= closed_g => continue,
                    CellState::Open { g_cost: open_g } => {
                        if g_cost < open_g {
                            if let Some(node) = self.open.iter_mut().find(|n| n.pos == next) {
                                node.g_cost = g_cost;
                                node.f_cost = g_cost + node.h_cost;
                                node.parent = ci as u32;
                            }
                            self.states[ni] = CellState::Open { g_cost };
                        }
                    }
                    CellState::Closed { .. } | CellState::Unseen => {
                        let h_cost = next.distance(&goal);
                        self.open.push(AStarNode {
                            pos: next,
                            g_cost,
                            h_cost,
                            f_cost: g_cost + h_cost,
                            parent: ci as u32,
                        });
                        self.states[ni] = CellState::Open { g_cost };
                    }
                }
            }
        }

        let reached_goal = end.is_some();
        let (end_pos, route_cost) = match end {
            Some(found) => found,
            None if self.open.is_empty() => return Err(NavError::NoRoute { iterations }),
            None if self.allow_partial && closest.0 != start => {
                log::debug!(
                    "Iteration cap {} hit; clipping route at ({}, {})",
                    self.max_iterations,
                    closest.0.x,
                    closest.0.y
                );
                (closest.0, closest.2)
            }
            None => {
                return Err(NavError::IterationCapReached {
                    cap: self.max_iterations,
                })
            }
        };

        let mut chain = Vec::new();
        let mut cursor = index(end_pos) as u32;
        while cursor != NO_PARENT && chain.len() <= self.parents.len() {
            chain.push(GridPos::new(cursor % width, cursor / width));
            cursor = self.parents[cursor as usize];
        }
        chain.reverse();

        let truncated = chain.len() > capacity;
        chain.truncate(capacity);
        out.extend(chain.into_iter().map(|cell| {
            let centre = grid.grid_to_world(cell);
            Waypoint::new(centre.x, centre.y)
        }));

        Ok(SearchReport {
            iterations,
            reached_goal,
            truncated,
            route_cost,
        })
    }
}
