//! Save/Load of the navigation grid and registered units
//!
//! Uses bincode for a compact binary snapshot. Paths are not saved: they
//! are cheap to recompute and their handles are tied to a live table.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::NavError;
use crate::grid::{GridCell, NavGrid};
use crate::movement::{MovementSimulator, UnitBody, UnitDrive};

/// Version number for snapshot format (increment when format changes)
const SNAPSHOT_VERSION: u32 = 1;

/// Serializable snapshot of a grid and the units standing on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Snapshot format version
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub cell_size: f32,
    /// Row-major cells; region ids are recomputed after loading
    pub cells: Vec<GridCell>,
    /// Units in ascending id order
    pub units: Vec<SerializableUnit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SerializableUnit {
    pub body: UnitBody,
    pub drive: UnitDrive,
}

impl GridSnapshot {
    pub fn capture(grid: &NavGrid, movement: &MovementSimulator) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            width: grid.width(),
            height: grid.height(),
            cell_size: grid.cell_size(),
            cells: grid.cells().to_vec(),
            units: movement
                .units()
                .into_iter()
                .map(|(body, drive)| SerializableUnit { body, drive })
                .collect(),
        }
    }
}

/// Write a snapshot of `grid` and every unit in `movement`
pub fn save_grid<W: Write>(
    writer: W,
    grid: &NavGrid,
    movement: &MovementSimulator,
) -> Result<(), SaveError> {
    let snapshot = GridSnapshot::capture(grid, movement);
    bincode::serialize_into(writer, &snapshot)?;
    Ok(())
}

/// Result of loading a snapshot
pub struct LoadedGrid {
    pub grid: NavGrid,
    pub units: Vec<SerializableUnit>,
}

/// Read a snapshot back. The grid is rebuilt and region labels are
/// recomputed; units are returned for the caller to re-register.
pub fn load_grid<R: Read>(reader: R) -> Result<LoadedGrid, SaveError> {
    let snapshot: GridSnapshot = bincode::deserialize_from(reader)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }

    let mut grid = NavGrid::from_cells(
        snapshot.width,
        snapshot.height,
        snapshot.cell_size,
        snapshot.cells,
    )?;
    grid.update_regions();

    Ok(LoadedGrid {
        grid,
        units: snapshot.units,
    })
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// Decoded fine but does not describe a valid grid or unit table
    Invalid(NavError),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<NavError> for SaveError {
    fn from(e: NavError) -> Self {
        SaveError::Invalid(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Snapshot version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Invalid(e) => write!(f, "Invalid snapshot: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}
