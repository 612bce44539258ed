//! Damage system - pressure-driven stochastic cell death
//!
//! Pressure selects one of three coarse hazard tiers. The tier's rate
//! decides how many living cells are hit this step; those cells are
//! sampled without replacement and each takes a random chunk of damage.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, DamageConfig};
use crate::population::Population;

/// Hazard regime selected by pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathTier {
    /// Pressure at or below the normal upper bound
    Normal,
    /// Between the normal bound and the severe threshold
    Elevated,
    /// At or above the severe threshold
    Severe,
}

impl DeathTier {
    pub fn from_pressure(iop: f64, config: &DamageConfig) -> Self {
        if iop <= config.normal_upper_bound {
            Self::Normal
        } else if iop < config.severe_threshold {
            Self::Elevated
        } else {
            Self::Severe
        }
    }
}

/// What one damage pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub tier: DeathTier,
    /// Cells selected for damage
    pub targets: usize,
    /// Cells that died from this pass
    pub killed: usize,
}

#[derive(Debug, Clone)]
pub struct DamageProcess {
    config: DamageConfig,
}

impl DamageProcess {
    pub fn new(config: &DamageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &DamageConfig {
        &self.config
    }

    pub fn rate(&self, tier: DeathTier) -> f64 {
        match tier {
            DeathTier::Normal => self.config.rate_normal,
            DeathTier::Elevated => self.config.rate_elevated,
            DeathTier::Severe => self.config.rate_severe,
        }
    }

    /// Damage a random subset of living cells.
    ///
    /// For each target, one index draw picks the cell from the remaining
    /// pool, then one uniform draw sets the damage. `killed <= targets`
    /// and `targets <= alive count` always hold.
    pub fn apply(&self, iop: f64, population: &mut Population, rng: &mut impl Rng) -> DamageOutcome {
        let tier = DeathTier::from_pressure(iop, &self.config);
        let mut pool = population.alive_ids();
        let targets = (pool.len() as f64 * self.rate(tier)).floor() as usize;

        let mut killed = 0;
        for _ in 0..targets {
            if pool.is_empty() {
                break;
            }
            let id = pool.swap_remove(rng.gen_range(0..pool.len()));
            let amount = rng.gen_range(self.config.min_damage..self.config.max_damage);
            if population.damage(id, amount) {
                killed += 1;
            }
        }

        log::debug!(
            "IOP {:.2} -> {:?} tier: {} targeted, {} killed",
            iop,
            tier,
            targets,
            killed
        );

        DamageOutcome {
            tier,
            targets,
            killed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetinaConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population(total: u32, rng: &mut StdRng) -> Population {
        let config = RetinaConfig {
            total_cells: total,
            ..Default::default()
        };
        Population::from_config(&config, rng).unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let config = DamageConfig::default();
        assert_eq!(DeathTier::from_pressure(15.0, &config), DeathTier::Normal);
        assert_eq!(DeathTier::from_pressure(21.0, &config), DeathTier::Normal);
        assert_eq!(DeathTier::from_pressure(21.0001, &config), DeathTier::Elevated);
        assert_eq!(DeathTier::from_pressure(29.999, &config), DeathTier::Elevated);
        assert_eq!(DeathTier::from_pressure(30.0, &config), DeathTier::Severe);
        assert_eq!(DeathTier::from_pressure(45.0, &config), DeathTier::Severe);
    }

    #[test]
    fn test_target_count_follows_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pop = population(1000, &mut rng);
        let process = DamageProcess::new(&DamageConfig::default()).unwrap();

        // 1000 * 0.0002 = 0.2 -> nothing targeted
        let normal = process.apply(15.0, &mut pop, &mut rng);
        assert_eq!(normal.targets, 0);
        assert_eq!(normal.killed, 0);

        let elevated = process.apply(25.0, &mut pop, &mut rng);
        assert_eq!(elevated.tier, DeathTier::Elevated);
        assert_eq!(elevated.targets, 5);

        let severe = process.apply(35.0, &mut pop, &mut rng);
        assert_eq!(severe.tier, DeathTier::Severe);
        assert!(severe.killed <= severe.targets);
    }

    #[test]
    fn test_single_hit_never_kills_healthy_cell() {
        // Max damage is below 1.0, so a fresh population cannot lose cells
        // on the first pass.
        let mut rng = StdRng::seed_from_u64(2);
        let mut pop = population(1000, &mut rng);
        let process = DamageProcess::new(&DamageConfig::default()).unwrap();

        let outcome = process.apply(40.0, &mut pop, &mut rng);
        assert_eq!(outcome.targets, 20);
        assert_eq!(outcome.killed, 0);

        let damaged = pop.cells().iter().filter(|c| c.health < 1.0).count();
        assert_eq!(damaged, 20);
        for cell in pop.cells().iter().filter(|c| c.health < 1.0) {
            assert!(cell.health > 0.5 - 1e-12 && cell.health <= 0.9 + 1e-12);
        }
    }

    #[test]
    fn test_full_rate_kills_eventually() {
        let config = DamageConfig {
            rate_severe: 1.0,
            ..Default::default()
        };
        let process = DamageProcess::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = population(100, &mut rng);

        let mut total_killed = 0;
        for _ in 0..20 {
            let alive_before = pop.alive_count();
            let outcome = process.apply(50.0, &mut pop, &mut rng);
            assert_eq!(outcome.targets, alive_before);
            total_killed += outcome.killed;
        }
        // 20 hits of at least 0.1 each drain every cell
        assert_eq!(pop.alive_count(), 0);
        assert_eq!(total_killed, 100);
    }

    #[test]
    fn test_dead_cells_are_never_targeted() {
        let config = DamageConfig {
            rate_severe: 1.0,
            ..Default::default()
        };
        let process = DamageProcess::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let mut pop = population(10, &mut rng);
        for id in 0..5 {
            pop.damage(id, 1.0);
        }

        let outcome = process.apply(50.0, &mut pop, &mut rng);
        assert_eq!(outcome.targets, 5);
        for id in 0..5 {
            assert_eq!(pop.cell(id).unwrap().health, 0.0);
        }
    }
}
