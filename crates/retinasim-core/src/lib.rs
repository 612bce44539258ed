//! RetinaSim Core - Glaucoma Progression Simulation Engine
//!
//! A stochastic model of a 3D block of retinal tissue whose cells die under
//! elevated intraocular pressure (IOP), with optional treatment and a
//! pluggable risk predictor.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`components`] | Cells, cell types, positions and bounds |
//! | [`config`] | Retina, pressure and damage parameters, scenarios, run settings |
//! | [`generation`] | Random placement of cells by type share |
//! | [`population`] | Cell store, damage/heal, aggregate statistics |
//! | [`systems`] | Per-step pressure drift and tiered cell death |
//! | [`engine`] | `GlaucomaSimulator`: stepping, treatment, summaries |
//! | [`predictor`] | Rule-based and learned risk predictors |
//! | [`report`] | Scenario reports, comparison table, histograms, slices |
//! | [`persistence`] | Bincode snapshots of simulator state |
//!
//! # Example
//!
//! ```rust,no_run
//! use retinasim_core::prelude::*;
//!
//! let config = SimulationConfig::default();
//! let mut sim = GlaucomaSimulator::from_seed(&config, 42, 28.0).unwrap();
//!
//! let records = sim.run(200, 50);
//! let summary = sim.summary();
//! println!("{} steps, mortality {:.2}%", records.len(), summary.final_mortality_rate * 100.0);
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod generation;
pub mod persistence;
pub mod population;
pub mod predictor;
pub mod report;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{RunConfig, Scenario, SimulationConfig};
    pub use crate::engine::{GlaucomaSimulator, SimulationSummary, StepRecord};
    pub use crate::population::Population;
    pub use crate::predictor::{Prediction, Predictor, RuleBasedPredictor};
}
