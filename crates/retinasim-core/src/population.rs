//! The retinal cell population.
//!
//! A `Population` owns every cell in a contiguous store indexed by cell id.
//! Its size is fixed at creation: cells die by flag, never by removal.
//! All mutation goes through [`Population::damage`] and [`Population::heal`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::{CellShare, ConfigError, RetinaConfig};
use crate::generation::generate_cells;

/// Counts for one cell type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub cell_type: CellType,
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
}

/// Aggregate snapshot of a population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub total_cells: usize,
    pub alive_cells: usize,
    pub dead_cells: usize,
    pub mortality_rate: f64,
    pub average_health: f64,
    pub by_type: Vec<TypeStats>,
}

#[derive(Debug, Clone)]
pub struct Population {
    cells: Vec<Cell>,
    bounds: BoundingBox,
    shares: Vec<CellShare>,
}

impl Population {
    /// Create a population of randomly placed cells.
    ///
    /// Each share yields `floor(total * proportion)` cells, so the realized
    /// size can fall short of `total` when shares do not divide evenly.
    pub fn generate(
        bounds: BoundingBox,
        total: u32,
        shares: &[CellShare],
        rng: &mut impl Rng,
    ) -> Result<Self, ConfigError> {
        let config = RetinaConfig {
            width: bounds.width(),
            height: bounds.height(),
            depth: bounds.depth(),
            total_cells: total,
            cell_types: shares.to_vec(),
        };
        Self::from_config(&config, rng)
    }

    pub fn from_config(config: &RetinaConfig, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        config.validate()?;
        let bounds = BoundingBox::from_size(config.width, config.height, config.depth);
        let cells = generate_cells(&bounds, config.total_cells, &config.cell_types, rng);
        Ok(Self {
            cells,
            bounds,
            shares: config.cell_types.clone(),
        })
    }

    /// Rebuild a population from stored cells (snapshots).
    pub(crate) fn from_parts(cells: Vec<Cell>, bounds: BoundingBox, shares: Vec<CellShare>) -> Self {
        Self {
            cells,
            bounds,
            shares,
        }
    }

    /// Apply damage to one cell.
    ///
    /// Returns true only when this call killed the cell. Unknown ids are
    /// ignored and return false.
    pub fn damage(&mut self, id: u32, amount: f64) -> bool {
        let Some(cell) = self.cells.get_mut(id as usize) else {
            return false;
        };
        cell.health = (cell.health - amount).clamp(0.0, 1.0);
        if cell.health <= 0.0 && cell.alive {
            cell.alive = false;
            return true;
        }
        false
    }

    /// Restore health to a living cell, capped at 1.0. Dead cells stay dead.
    pub fn heal(&mut self, id: u32, amount: f64) {
        if let Some(cell) = self.cells.get_mut(id as usize) {
            if cell.alive {
                cell.health = (cell.health + amount).clamp(0.0, 1.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.get(id as usize)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Declared composition, in generation order
    pub fn shares(&self) -> &[CellShare] {
        &self.shares
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|c| c.alive).count()
    }

    pub fn dead_count(&self) -> usize {
        self.cells.len() - self.alive_count()
    }

    /// Mean health of living cells, 0.0 when none are alive
    pub fn average_health(&self) -> f64 {
        let (sum, count) = self
            .cells
            .iter()
            .filter(|c| c.alive)
            .fold((0.0, 0usize), |(sum, count), c| (sum + c.health, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Fraction of cells that have died, 0.0 for an empty population
    pub fn mortality_rate(&self) -> f64 {
        if self.cells.is_empty() {
            0.0
        } else {
            self.dead_count() as f64 / self.cells.len() as f64
        }
    }

    /// Ids of living cells in ascending order
    pub fn alive_ids(&self) -> Vec<u32> {
        self.cells.iter().filter(|c| c.alive).map(|c| c.id).collect()
    }

    pub fn cells_of_type(&self, cell_type: CellType) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |c| c.cell_type == cell_type)
    }

    /// Per-type counts in declared order
    pub fn type_breakdown(&self) -> Vec<TypeStats> {
        self.shares
            .iter()
            .map(|share| {
                let (total, alive) = self
                    .cells_of_type(share.cell_type)
                    .fold((0, 0), |(total, alive), c| (total + 1, alive + c.alive as usize));
                TypeStats {
                    cell_type: share.cell_type,
                    total,
                    alive,
                    dead: total - alive,
                }
            })
            .collect()
    }

    pub fn statistics(&self) -> PopulationStats {
        let alive_cells = self.alive_count();
        PopulationStats {
            total_cells: self.cells.len(),
            alive_cells,
            dead_cells: self.cells.len() - alive_cells,
            mortality_rate: self.mortality_rate(),
            average_health: self.average_health(),
            by_type: self.type_breakdown(),
        }
    }

    /// Positions of living cells, for plotting
    pub fn alive_positions(&self) -> Vec<Vec3> {
        self.cells.iter().filter(|c| c.alive).map(|c| c.position).collect()
    }

    /// Health of living cells, for plotting
    pub fn alive_health(&self) -> Vec<f64> {
        self.cells.iter().filter(|c| c.alive).map(|c| c.health).collect()
    }
}
