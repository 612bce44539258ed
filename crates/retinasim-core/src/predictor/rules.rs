//! Fixed-rule predictor

use super::{Prediction, Predictor};

/// IOP at which scores start rising
const IOP_BASELINE: f64 = 10.0;

/// IOP span mapped onto [0, 1]
const IOP_SPAN: f64 = 40.0;

/// Linear map of IOP onto the three scores. Ignores mortality.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPredictor;

impl Predictor for RuleBasedPredictor {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn predict(&self, iop: f64, _mortality_rate: f64) -> Prediction {
        let normalized = ((iop - IOP_BASELINE) / IOP_SPAN).clamp(0.0, 1.0);
        Prediction::clamped(normalized, (1.0 - normalized).max(0.0), normalized * 1.5)
    }
}
