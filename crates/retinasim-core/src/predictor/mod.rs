//! Glaucoma risk prediction from an IOP reading.
//!
//! Two interchangeable strategies sit behind [`Predictor`]: a fixed rule
//! and a small trained network. Callers pick one with [`select_predictor`]
//! and never need to know which they got. The engine does not depend on
//! either.

mod network;
mod rules;

pub use network::*;
pub use rules::*;

use serde::{Deserialize, Serialize};

/// Three risk scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub glaucoma_progression: f64,
    pub cell_vitality: f64,
    pub risk_level: f64,
}

impl Prediction {
    /// Build a prediction, clamping every score into [0, 1]. NaN maps to 0.
    pub fn clamped(glaucoma_progression: f64, cell_vitality: f64, risk_level: f64) -> Self {
        Self {
            glaucoma_progression: unit(glaucoma_progression),
            cell_vitality: unit(cell_vitality),
            risk_level: unit(risk_level),
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub trait Predictor {
    /// Short strategy name for reports
    fn name(&self) -> &str;

    fn predict(&self, iop: f64, mortality_rate: f64) -> Prediction;

    /// Predict with no mortality information
    fn predict_iop(&self, iop: f64) -> Prediction {
        self.predict(iop, 0.0)
    }
}

/// Use the learned model when one is available, the rule otherwise
pub fn select_predictor(learned: Option<LearnedPredictor>) -> Box<dyn Predictor> {
    match learned {
        Some(model) => Box::new(model),
        None => {
            log::info!("No learned model available, using rule-based predictor");
            Box::new(RuleBasedPredictor)
        }
    }
}

/// Errors from building, loading, or saving a learned model
#[derive(Debug)]
pub enum PredictorError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Shape { expected: usize, found: usize },
    Empty,
}

impl From<std::io::Error> for PredictorError {
    fn from(e: std::io::Error) -> Self {
        PredictorError::Io(e)
    }
}

impl From<serde_json::Error> for PredictorError {
    fn from(e: serde_json::Error) -> Self {
        PredictorError::Json(e)
    }
}

impl std::fmt::Display for PredictorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictorError::Io(e) => write!(f, "IO error: {}", e),
            PredictorError::Json(e) => write!(f, "Model format error: {}", e),
            PredictorError::Shape { expected, found } => {
                write!(f, "Layer shape mismatch: expected {} inputs, found {}", expected, found)
            }
            PredictorError::Empty => write!(f, "Model has no layers"),
        }
    }
}

impl std::error::Error for PredictorError {}
