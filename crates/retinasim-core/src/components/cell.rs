//! Retinal cell records.

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Kind of retinal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Photoreceptor,
    Bipolar,
    Ganglion,
    Glial,
}

impl CellType {
    pub const ALL: [CellType; 4] = [
        CellType::Photoreceptor,
        CellType::Bipolar,
        CellType::Ganglion,
        CellType::Glial,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CellType::Photoreceptor => "photoreceptor",
            CellType::Bipolar => "bipolar",
            CellType::Ganglion => "ganglion",
            CellType::Glial => "glial",
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell. Owned by a `Population`; health and vitality only change
/// through the population's methods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    /// Index into the owning population's storage
    pub id: u32,
    pub cell_type: CellType,
    /// Fixed at creation
    pub position: Vec3,
    /// 0.0 (dead) to 1.0 (fully healthy)
    pub health: f64,
    pub alive: bool,
}

impl Cell {
    pub fn new(id: u32, cell_type: CellType, position: Vec3) -> Self {
        Self {
            id,
            cell_type,
            position,
            health: 1.0,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cell(id={}, type={}, pos=({:.1}, {:.1}, {:.1}), health={:.2})",
            self.id, self.cell_type, self.position.x, self.position.y, self.position.z, self.health
        )
    }
}
