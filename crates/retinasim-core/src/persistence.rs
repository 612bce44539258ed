//! Save/Load of simulator state
//!
//! Uses bincode for a compact binary snapshot of one simulator: pressure
//! state, histories, and every cell. A loaded snapshot is for inspection
//! only. The random stream is not stored, so a run cannot be resumed
//! bit-for-bit from it.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::*;
use crate::config::CellShare;
use crate::engine::GlaucomaSimulator;
use crate::population::Population;

/// Version number for snapshot format (increment when format changes)
const SNAPSHOT_VERSION: u32 = 1;

/// Serializable state of a simulator at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Scenario label the run belonged to
    pub label: String,
    pub step: u32,
    pub current_iop: f64,
    pub initial_iop: f64,
    pub treatment_active: bool,
    pub iop_history: Vec<f64>,
    pub mortality_history: Vec<f64>,
    pub bounds: BoundingBox,
    pub shares: Vec<CellShare>,
    pub cells: Vec<Cell>,
}

impl Snapshot {
    pub fn capture(sim: &GlaucomaSimulator, label: &str) -> Self {
        let population = sim.population();
        Self {
            version: SNAPSHOT_VERSION,
            label: label.to_string(),
            step: sim.step_count(),
            current_iop: sim.current_iop(),
            initial_iop: sim.initial_iop(),
            treatment_active: sim.treatment_active(),
            iop_history: sim.iop_history().to_vec(),
            mortality_history: sim.mortality_history().to_vec(),
            bounds: *population.bounds(),
            shares: population.shares().to_vec(),
            cells: population.cells().to_vec(),
        }
    }

    /// Rebuild the stored population for queries
    pub fn population(&self) -> Population {
        Population::from_parts(self.cells.clone(), self.bounds, self.shares.clone())
    }
}

/// Save a simulator snapshot to a writer
pub fn save_snapshot<W: Write>(writer: W, sim: &GlaucomaSimulator, label: &str) -> Result<(), SaveError> {
    let snapshot = Snapshot::capture(sim, label);
    bincode::serialize_into(writer, &snapshot)?;
    log::debug!(
        "Saved snapshot '{}' at step {} ({} cells)",
        label,
        snapshot.step,
        snapshot.cells.len()
    );
    Ok(())
}

/// Load a snapshot from a reader
pub fn load_snapshot<R: Read>(reader: R) -> Result<Snapshot, SaveError> {
    let snapshot: Snapshot = bincode::deserialize_from(reader)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }

    Ok(snapshot)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
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

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(f, "Snapshot version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for SaveError {}
