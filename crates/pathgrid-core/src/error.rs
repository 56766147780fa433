//! Error type for fallible core operations.
//!
//! The [`Pathfinder`](crate::pathfinder::Pathfinder) facade never surfaces
//! these as panics: it turns each one into a failure sentinel and keeps the
//! message around as the last error string.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(f32),

    #[error("Goal cell ({x}, {y}) is not walkable")]
    GoalNotWalkable { x: u32, y: u32 },

    #[error("Start region {start} and goal region {goal} are disconnected")]
    DisconnectedRegions { start: u16, goal: u16 },

    #[error("No route found after {iterations} iterations")]
    NoRoute { iterations: u32 },

    #[error("Search exceeded the iteration cap of {cap}")]
    IterationCapReached { cap: u32 },

    #[error("Waypoint buffer has zero capacity")]
    ZeroWaypointCapacity,

    #[error("Path table is full ({capacity} paths)")]
    PathTableFull { capacity: usize },

    #[error("Unknown path handle {0}")]
    UnknownPath(u64),

    #[error("Unit table is full ({capacity} units)")]
    UnitTableFull { capacity: usize },

    #[error("Unit {0} is already registered")]
    DuplicateUnit(u32),

    #[error("Unknown unit {0}")]
    UnknownUnit(u32),

    #[error("Formation needs at least one registered unit")]
    EmptyFormation,

    #[error("No active formation")]
    NoFormation,

    #[error("Unit {0} does not lead the active formation")]
    NotFormationLeader(u32),

    #[error("Invalid formation spacing: {0}")]
    InvalidSpacing(f32),

    #[error("Invalid coordinate ({x}, {y})")]
    InvalidCoordinate { x: f32, y: f32 },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

/// Result type alias for core operations
pub type NavResult<T> = Result<T, NavError>;
