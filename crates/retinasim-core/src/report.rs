//! Reporting - read-only views over finished runs.
//!
//! Produces the data a plotter or a human needs: per-scenario reports,
//! a fixed-width comparison table, health histograms and depth slices.
//! Nothing here mutates a simulator.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use crate::config::Scenario;
use crate::engine::{GlaucomaSimulator, SimulationSummary, StepRecord};
use crate::population::{Population, PopulationStats};
use crate::predictor::{Prediction, Predictor};

/// Everything recorded about one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub label: String,
    pub description: String,
    pub seed: u64,
    /// Name of the predictor that produced `prediction`
    pub predictor: String,
    pub summary: SimulationSummary,
    pub statistics: PopulationStats,
    pub prediction: Prediction,
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    /// Collect a report from a finished simulator. The prediction uses the
    /// final IOP and mortality.
    pub fn new(
        scenario: &Scenario,
        seed: u64,
        sim: &GlaucomaSimulator,
        predictor: &dyn Predictor,
        steps: Vec<StepRecord>,
    ) -> Self {
        let summary = sim.summary();
        let prediction = predictor.predict(summary.final_iop, summary.final_mortality_rate);
        Self {
            label: scenario.label.clone(),
            description: scenario.description.clone(),
            seed,
            predictor: predictor.name().to_string(),
            summary,
            statistics: sim.population().statistics(),
            prediction,
            steps,
        }
    }

    /// IOP after each recorded step
    pub fn iop_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.iop).collect()
    }

    pub fn mortality_series(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.mortality_rate).collect()
    }
}

/// One line of the comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub label: String,
    pub final_iop: f64,
    pub mortality_rate: f64,
    pub average_health: f64,
    pub alive_cells: usize,
    pub prediction: Prediction,
}

impl From<&ScenarioReport> for ComparisonRow {
    fn from(report: &ScenarioReport) -> Self {
        Self {
            label: report.label.clone(),
            final_iop: report.summary.final_iop,
            mortality_rate: report.summary.final_mortality_rate,
            average_health: report.summary.final_average_health,
            alive_cells: report.summary.alive_cells,
            prediction: report.prediction,
        }
    }
}

/// Fixed-width text table comparing scenario outcomes
pub fn comparison_table(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>9} {:>10} {:>8} {:>8} {:>11} {:>9} {:>7}",
        "Scenario", "IOP", "Mortality", "Health", "Alive", "Progression", "Vitality", "Risk"
    );
    let _ = writeln!(out, "{}", "-".repeat(24 + 9 + 10 + 8 + 8 + 11 + 9 + 7 + 7));
    for row in reports.iter().map(ComparisonRow::from) {
        let _ = writeln!(
            out,
            "{:<24} {:>9.2} {:>9.2}% {:>8.3} {:>8} {:>10.1}% {:>8.1}% {:>6.1}%",
            row.label,
            row.final_iop,
            row.mortality_rate * 100.0,
            row.average_health,
            row.alive_cells,
            row.prediction.glaucoma_progression * 100.0,
            row.prediction.cell_vitality * 100.0,
            row.prediction.risk_level * 100.0
        );
    }
    out
}

/// Bucket the health of living cells into `bins` equal bins over [0, 1].
/// Health 1.0 lands in the last bin.
pub fn health_histogram(population: &Population, bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }
    for health in population.alive_health() {
        let idx = ((health * bins as f64) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Mean health on a 2D grid for cells within `thickness` of depth `z`.
///
/// `grid` is (columns, rows); the result is indexed `[row][column]`.
/// Grid squares without any cell are `None`. Dead cells count with
/// health 0. Returns an empty grid when either dimension is zero.
pub fn health_slice(population: &Population, z: f64, thickness: f64, grid: (usize, usize)) -> Vec<Vec<Option<f64>>> {
    let (columns, rows) = grid;
    if columns == 0 || rows == 0 {
        return Vec::new();
    }

    let bounds = population.bounds();
    let mut sums = vec![vec![0.0; columns]; rows];
    let mut counts = vec![vec![0u32; columns]; rows];

    for cell in population.cells() {
        if (cell.position.z - z).abs() >= thickness {
            continue;
        }
        let column = grid_index(cell.position.x - bounds.min.x, bounds.width(), columns);
        let row = grid_index(cell.position.y - bounds.min.y, bounds.height(), rows);
        sums[row][column] += cell.health;
        counts[row][column] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum_row, count_row)| {
            sum_row
                .into_iter()
                .zip(count_row)
                .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
                .collect()
        })
        .collect()
}

fn grid_index(offset: f64, extent: f64, size: usize) -> usize {
    if extent <= 0.0 {
        return 0;
    }
    ((offset / extent * size as f64) as usize).min(size - 1)
}

/// File name for a scenario's JSON report: "Glaucoma + Treatment" becomes
/// "glaucoma_com_treatment.json"
pub fn results_file_name(label: &str) -> String {
    format!("{}.json", label.to_lowercase().replace(' ', "_").replace('+', "com"))
}

/// Write `value` as pretty JSON, creating parent directories
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    log::info!("Results saved to {}", path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> io::Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
