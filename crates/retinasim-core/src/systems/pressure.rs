//! Pressure system - random walk of intraocular pressure
//!
//! Each step adds a fixed drift (upward untreated, downward under
//! treatment) plus Gaussian noise, then clamps to the floor. There is no
//! mean reversion and no upper bound.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{ConfigError, PressureConfig};

#[derive(Debug, Clone)]
pub struct PressureProcess {
    noise: Normal<f64>,
    floor: f64,
    rising_drift: f64,
    treated_drift: f64,
}

impl PressureProcess {
    pub fn new(config: &PressureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let noise = Normal::new(0.0, config.noise_level).map_err(|_| {
            ConfigError::InvalidParameter {
                name: "noise_level",
                value: config.noise_level,
            }
        })?;
        Ok(Self {
            noise,
            floor: config.floor,
            rising_drift: config.rising_drift,
            treated_drift: config.treated_drift,
        })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Drift applied per step for the given treatment state
    pub fn drift(&self, treatment_active: bool) -> f64 {
        if treatment_active {
            self.treated_drift
        } else {
            self.rising_drift
        }
    }

    /// Next pressure value. Draws exactly one noise sample.
    pub fn advance(&self, iop: f64, treatment_active: bool, rng: &mut impl Rng) -> f64 {
        let noise = self.noise.sample(rng);
        (iop + self.drift(treatment_active) + noise).max(self.floor)
    }
}
