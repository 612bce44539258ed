//! Simulation parameters, scenario presets, and run settings.
//!
//! Everything the engine needs is passed in through these values at
//! construction time; there is no process-wide mutable configuration.
//! Defaults reproduce the reference retina: a 100 x 100 x 50 volume with
//! 10,000 cells, normal pressure up to 21 mmHg and severe damage from 30 mmHg.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::components::CellType;

/// Share of the population assigned to one cell type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellShare {
    pub cell_type: CellType,
    pub proportion: f64,
}

impl CellShare {
    pub fn new(cell_type: CellType, proportion: f64) -> Self {
        Self {
            cell_type,
            proportion,
        }
    }
}

/// Slack allowed when proportions sum past 1.0 through rounding
const PROPORTION_TOLERANCE: f64 = 1e-9;

/// Retina volume and cell composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetinaConfig {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub total_cells: u32,
    /// Generation order follows this list
    pub cell_types: Vec<CellShare>,
}

impl Default for RetinaConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            depth: 50.0,
            total_cells: 10_000,
            cell_types: vec![
                CellShare::new(CellType::Photoreceptor, 0.4),
                CellShare::new(CellType::Bipolar, 0.3),
                CellShare::new(CellType::Ganglion, 0.2),
                CellShare::new(CellType::Glial, 0.1),
            ],
        }
    }
}

impl RetinaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidDimension { name, value });
            }
        }
        for share in &self.cell_types {
            if !share.proportion.is_finite() || share.proportion < 0.0 {
                return Err(ConfigError::InvalidProportion {
                    cell_type: share.cell_type,
                    value: share.proportion,
                });
            }
        }
        let total: f64 = self.cell_types.iter().map(|s| s.proportion).sum();
        if total > 1.0 + PROPORTION_TOLERANCE {
            return Err(ConfigError::InvalidProportionSum { total });
        }
        Ok(())
    }
}

/// Pressure random walk parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureConfig {
    /// Default starting IOP (mmHg) when a scenario does not override it
    pub initial_iop: f64,
    /// Standard deviation of the per-step Gaussian noise
    pub noise_level: f64,
    /// Pressure never drops below this
    pub floor: f64,
    /// Per-step drift while untreated
    pub rising_drift: f64,
    /// Per-step drift while treatment is active
    pub treated_drift: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            initial_iop: 15.0,
            noise_level: 0.05,
            floor: 5.0,
            rising_drift: 0.05,
            treated_drift: -0.10,
        }
    }
}

impl PressureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "noise_level",
                value: self.noise_level,
            });
        }
        for (name, value) in [
            ("initial_iop", self.initial_iop),
            ("floor", self.floor),
            ("rising_drift", self.rising_drift),
            ("treated_drift", self.treated_drift),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Hazard tiers and damage magnitudes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageConfig {
    /// Upper end of normal IOP (inclusive)
    pub normal_upper_bound: f64,
    /// IOP at or above this is severe
    pub severe_threshold: f64,
    pub rate_normal: f64,
    pub rate_elevated: f64,
    pub rate_severe: f64,
    /// Lower end of the per-hit damage range
    pub min_damage: f64,
    /// Upper end of the per-hit damage range (exclusive)
    pub max_damage: f64,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            normal_upper_bound: 21.0,
            severe_threshold: 30.0,
            rate_normal: 0.0002,
            rate_elevated: 0.005,
            rate_severe: 0.02,
            min_damage: 0.1,
            max_damage: 0.5,
        }
    }
}

impl DamageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.normal_upper_bound.is_finite()
            || !self.severe_threshold.is_finite()
            || self.normal_upper_bound > self.severe_threshold
        {
            return Err(ConfigError::InvalidThresholds {
                normal_upper_bound: self.normal_upper_bound,
                severe_threshold: self.severe_threshold,
            });
        }
        for (name, value) in [
            ("rate_normal", self.rate_normal),
            ("rate_elevated", self.rate_elevated),
            ("rate_severe", self.rate_severe),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if !self.min_damage.is_finite()
            || !self.max_damage.is_finite()
            || self.min_damage < 0.0
            || self.min_damage >= self.max_damage
        {
            return Err(ConfigError::InvalidDamageRange {
                min: self.min_damage,
                max: self.max_damage,
            });
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub retina: RetinaConfig,
    pub pressure: PressureConfig,
    pub damage: DamageConfig,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retina.validate()?;
        self.pressure.validate()?;
        self.damage.validate()
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// A named patient scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub label: String,
    pub description: String,
    pub initial_iop: f64,
    /// Step index after which treatment starts, if ever
    pub treatment_at: Option<u32>,
    pub treatment_effectiveness: f64,
    /// Added to the run's base seed so scenarios draw independent streams
    pub seed_offset: u64,
}

impl Scenario {
    pub fn healthy() -> Self {
        Self {
            label: "Healthy Patient".into(),
            description: "Normal IOP (15 mmHg), no glaucoma".into(),
            initial_iop: 15.0,
            treatment_at: None,
            treatment_effectiveness: 0.0,
            seed_offset: 0,
        }
    }

    pub fn glaucoma() -> Self {
        Self {
            label: "Moderate Glaucoma".into(),
            description: "Elevated IOP (28 mmHg), untreated".into(),
            initial_iop: 28.0,
            treatment_at: None,
            treatment_effectiveness: 0.0,
            seed_offset: 1,
        }
    }

    pub fn severe() -> Self {
        Self {
            label: "Severe Glaucoma".into(),
            description: "Very high IOP (38 mmHg), accelerated damage".into(),
            initial_iop: 38.0,
            treatment_at: None,
            treatment_effectiveness: 0.0,
            seed_offset: 3,
        }
    }

    pub fn treated() -> Self {
        Self {
            label: "Glaucoma + Treatment".into(),
            description: "Elevated IOP (28 mmHg), treated from step 100".into(),
            initial_iop: 28.0,
            treatment_at: Some(100),
            treatment_effectiveness: 0.85,
            seed_offset: 2,
        }
    }

    /// Seed for this scenario's run. Wraps instead of overflowing.
    pub fn seed(&self, base_seed: u64) -> u64 {
        base_seed.wrapping_add(self.seed_offset)
    }

    /// Scenarios the runner executes by default
    pub fn default_set() -> Vec<Scenario> {
        vec![Self::healthy(), Self::glaucoma(), Self::treated()]
    }
}

/// Settings for one batch of scenario runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub num_steps: u32,
    pub log_interval: u32,
    pub base_seed: u64,
    pub results_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_steps: 200,
            log_interval: 50,
            base_seed: 42,
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Errors raised while building or loading a configuration
#[derive(Debug)]
pub enum ConfigError {
    InvalidDimension { name: &'static str, value: f64 },
    InvalidProportion { cell_type: CellType, value: f64 },
    InvalidProportionSum { total: f64 },
    InvalidParameter { name: &'static str, value: f64 },
    InvalidThresholds { normal_upper_bound: f64, severe_threshold: f64 },
    InvalidDamageRange { min: f64, max: f64 },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidDimension { name, value } => {
                write!(f, "Retina {} must be positive and finite, got {}", name, value)
            }
            ConfigError::InvalidProportion { cell_type, value } => {
                write!(f, "Proportion for {} must be non-negative, got {}", cell_type, value)
            }
            ConfigError::InvalidProportionSum { total } => {
                write!(f, "Cell type proportions sum to {}, more than 1", total)
            }
            ConfigError::InvalidParameter { name, value } => {
                write!(f, "Invalid value for {}: {}", name, value)
            }
            ConfigError::InvalidThresholds {
                normal_upper_bound,
                severe_threshold,
            } => write!(
                f,
                "Normal IOP bound {} must not exceed severe threshold {}",
                normal_upper_bound, severe_threshold
            ),
            ConfigError::InvalidDamageRange { min, max } => {
                write!(f, "Damage range [{}, {}) is empty or negative", min, max)
            }
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        let total: f64 = config.retina.cell_types.iter().map(|s| s.proportion).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_zero_width() {
        let mut config = SimulationConfig::default();
        config.retina.width = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimension { name: "width", .. })
        ));
    }

    #[test]
    fn test_rejects_negative_proportion() {
        let mut config = SimulationConfig::default();
        config.retina.cell_types[2].proportion = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProportion {
                cell_type: CellType::Ganglion,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_proportions_over_one() {
        let mut config = SimulationConfig::default();
        config.retina.total_cells = u32::MAX;
        config.retina.cell_types[0].proportion = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProportionSum { .. })
        ));

        // Thirds sum to a hair under or over 1.0
        config.retina.cell_types = CellType::ALL[..3]
            .iter()
            .map(|&t| CellShare::new(t, 1.0 / 3.0))
            .collect();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = SimulationConfig::default();
        config.damage.normal_upper_bound = 35.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_noise() {
        let mut config = SimulationConfig::default();
        config.pressure.noise_level = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_type_order() {
        let mut config = SimulationConfig::default();
        config.retina.cell_types.reverse();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = SimulationConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.retina.cell_types[0].cell_type, CellType::Glial);
    }

    #[test]
    fn test_invalid_json_reports_parse_error() {
        let err = SimulationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("Config parse error"));
    }

    #[test]
    fn test_scenario_seed_wraps() {
        assert_eq!(Scenario::glaucoma().seed(42), 43);
        assert_eq!(Scenario::healthy().seed(u64::MAX), u64::MAX);
        assert_eq!(Scenario::treated().seed(u64::MAX), 1);
    }

    #[test]
    fn test_default_scenarios_have_distinct_seeds() {
        let set = Scenario::default_set();
        assert_eq!(set.len(), 3);
        let mut offsets: Vec<u64> = set.iter().map(|s| s.seed_offset).collect();
        offsets.dedup();
        assert_eq!(offsets.len(), 3);
        assert_eq!(Scenario::treated().treatment_at, Some(100));
    }
}
