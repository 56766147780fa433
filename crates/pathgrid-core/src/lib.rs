//! pathgrid core - Grid Pathfinding and Unit Movement
//!
//! A* search over a bounded 2D grid, a table of computed paths addressed
//! by opaque handles, and a per-tick kinematic simulator that moves units
//! with steering, collision avoidance and formations.
//!
//! # Architecture
//!
//! - **Grid** (`grid`): walkability, cost and region labels per cell
//! - **Search** (`astar`): bounded-iteration A*, 8-connected
//! - **Paths** (`path`, `smoothing`): handle-indexed path store in a `hecs` world
//! - **Units** (`movement`, `collision`, `steering`, `formation`): kinematic
//!   records keyed by caller ids, advanced once per tick
//! - **Facade** (`pathfinder`): owns all of the above, turns errors into sentinels
//!
//! # Example
//!
//! ```rust
//! use pathgrid_core::prelude::*;
//!
//! let mut pf = Pathfinder::new();
//! pf.initialize();
//! pf.set_grid_dimensions(10, 10, 1.0);
//!
//! let handle = pf.find_path(0.5, 0.5, 9.5, 9.5, 0.5);
//! assert_eq!(pf.path_status(handle), PathStatus::Found);
//!
//! pf.add_unit(1, 0.5, 0.5, 5.0, 2.0, 0.5);
//! let next = pf.next_waypoint(handle);
//! pf.set_unit_target(1, next.x, next.y);
//! pf.update(1.0 / 60.0);
//! ```

pub mod astar;
pub mod collision;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formation;
pub mod grid;
pub mod math;
pub mod movement;
pub mod path;
pub mod pathfinder;
pub mod persistence;
pub mod smoothing;
pub mod spatial;
pub mod steering;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::config::{NavConfig, SteeringWeights};
    pub use crate::error::{NavError, NavResult};
    pub use crate::formation::FormationType;
    pub use crate::grid::{GridPos, NavGrid};
    pub use crate::math::Vec2;
    pub use crate::movement::MovementState;
    pub use crate::path::{PathHandle, PathStatus, Waypoint};
    pub use crate::pathfinder::Pathfinder;
    pub use crate::smoothing::{LineOfSightSmoother, NoSmoothing, PathSmoother};
    pub use crate::steering::{Behavior, SteeringContext};
}
