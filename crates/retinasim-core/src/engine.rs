//! Simulation engine - main entry point for running a glaucoma simulation

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SimulationConfig};
use crate::population::Population;
use crate::systems::{DamageProcess, PressureProcess};

/// Result of one simulation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    /// IOP after this step's pressure update
    pub iop: f64,
    pub cells_killed_this_step: usize,
    pub total_alive_cells: usize,
    pub total_dead_cells: usize,
    pub mortality_rate: f64,
    pub average_health: f64,
}

/// Read-only digest of a simulator's accumulated state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total_steps: u32,
    pub final_iop: f64,
    pub mean_iop: f64,
    pub max_iop: f64,
    pub min_iop: f64,
    pub treatment_active: bool,
    pub final_mortality_rate: f64,
    pub final_average_health: f64,
    pub total_cells: usize,
    pub alive_cells: usize,
    pub dead_cells: usize,
}

/// Drives one population through pressure changes and cell death.
///
/// Owns its population and its random source; two simulators never share
/// state, so scenarios can run side by side as long as each gets its own
/// seed.
pub struct GlaucomaSimulator {
    population: Population,
    rng: StdRng,
    pressure: PressureProcess,
    damage: DamageProcess,
    current_iop: f64,
    initial_iop: f64,
    step_count: u32,
    treatment_active: bool,
    iop_history: Vec<f64>,
    mortality_history: Vec<f64>,
}

impl GlaucomaSimulator {
    /// Build a simulator around an existing population.
    ///
    /// `rng` should be the generator the population was created with, so a
    /// whole run stays on a single random stream.
    pub fn new(
        population: Population,
        rng: StdRng,
        config: &SimulationConfig,
        initial_iop: f64,
    ) -> Result<Self, ConfigError> {
        if !initial_iop.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "initial_iop",
                value: initial_iop,
            });
        }
        if initial_iop < config.pressure.floor {
            log::warn!(
                "Initial IOP {:.1} is below the pressure floor {:.1}",
                initial_iop,
                config.pressure.floor
            );
        }

        Ok(Self {
            population,
            rng,
            pressure: PressureProcess::new(&config.pressure)?,
            damage: DamageProcess::new(&config.damage)?,
            current_iop: initial_iop,
            initial_iop,
            step_count: 0,
            treatment_active: false,
            iop_history: vec![initial_iop],
            mortality_history: Vec::new(),
        })
    }

    /// Seed a generator, grow the retina from it and keep the same
    /// generator for stepping.
    pub fn from_seed(config: &SimulationConfig, seed: u64, initial_iop: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let population = Population::from_config(&config.retina, &mut rng)?;
        log::debug!(
            "Seed {}: generated {} cells (requested {})",
            seed,
            population.len(),
            config.retina.total_cells
        );
        Self::new(population, rng, config, initial_iop)
    }

    /// Start counting steps from `step` instead of zero
    pub fn with_start_step(mut self, step: u32) -> Self {
        self.step_count = step;
        self
    }

    /// Advance one step: pressure, then damage, then bookkeeping
    pub fn step(&mut self) -> StepRecord {
        self.current_iop = self
            .pressure
            .advance(self.current_iop, self.treatment_active, &mut self.rng);
        self.iop_history.push(self.current_iop);

        let outcome = self
            .damage
            .apply(self.current_iop, &mut self.population, &mut self.rng);

        let mortality = self.population.mortality_rate();
        self.mortality_history.push(mortality);
        self.step_count = self.step_count.saturating_add(1);

        let alive = self.population.alive_count();
        StepRecord {
            step: self.step_count,
            iop: self.current_iop,
            cells_killed_this_step: outcome.killed,
            total_alive_cells: alive,
            total_dead_cells: self.population.len() - alive,
            mortality_rate: mortality,
            average_health: self.population.average_health(),
        }
    }

    /// Run `num_steps` steps, logging progress every `log_interval` steps
    /// (0 disables logging).
    pub fn run(&mut self, num_steps: u32, log_interval: u32) -> Vec<StepRecord> {
        let mut records = Vec::with_capacity(num_steps as usize);
        for _ in 0..num_steps {
            let record = self.step();
            if log_interval > 0 && record.step % log_interval == 0 {
                log::info!(
                    "Step {}: IOP={:.1} mmHg, Alive={}, Mortality={:.2}%",
                    record.step,
                    record.iop,
                    record.total_alive_cells,
                    record.mortality_rate * 100.0
                );
            }
            records.push(record);
        }
        records
    }

    /// Start treatment and immediately pull pressure toward the normal
    /// range. Pressure never drops below the initial IOP here.
    pub fn apply_treatment(&mut self, effectiveness: f64) {
        let effectiveness = effectiveness.clamp(0.0, 1.0);
        self.treatment_active = true;

        let reduction = (self.current_iop - self.damage.config().normal_upper_bound) * effectiveness;
        self.current_iop = (self.current_iop - reduction).max(self.initial_iop);

        log::info!(
            "Treatment started at step {} (effectiveness {:.2}), IOP now {:.1} mmHg",
            self.step_count,
            effectiveness,
            self.current_iop
        );
    }

    /// Stop treatment. Pressure resumes its upward drift from the next step.
    pub fn stop_treatment(&mut self) {
        self.treatment_active = false;
        log::info!("Treatment stopped at step {}", self.step_count);
    }

    pub fn summary(&self) -> SimulationSummary {
        let (sum, max, min) = self.iop_history.iter().fold(
            (0.0, f64::NEG_INFINITY, f64::INFINITY),
            |(sum, max, min), &iop| (sum + iop, max.max(iop), min.min(iop)),
        );
        let alive = self.population.alive_count();

        SimulationSummary {
            total_steps: self.step_count,
            final_iop: self.current_iop,
            mean_iop: sum / self.iop_history.len() as f64,
            max_iop: max,
            min_iop: min,
            treatment_active: self.treatment_active,
            final_mortality_rate: self.population.mortality_rate(),
            final_average_health: self.population.average_health(),
            total_cells: self.population.len(),
            alive_cells: alive,
            dead_cells: self.population.len() - alive,
        }
    }

    pub fn current_iop(&self) -> f64 {
        self.current_iop
    }

    pub fn initial_iop(&self) -> f64 {
        self.initial_iop
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn treatment_active(&self) -> bool {
        self.treatment_active
    }

    /// Every IOP value so far, starting with the initial one
    pub fn iop_history(&self) -> &[f64] {
        &self.iop_history
    }

    /// Mortality after each completed step
    pub fn mortality_history(&self) -> &[f64] {
        &self.mortality_history
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    #[cfg(test)]
    pub(crate) fn set_current_iop(&mut self, iop: f64) {
        self.current_iop = iop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.retina.total_cells = 1000;
        config
    }

    #[test]
    fn test_simulator_creation() {
        let sim = GlaucomaSimulator::from_seed(&small_config(), 42, 15.0).unwrap();
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.iop_history(), &[15.0]);
        assert!(sim.mortality_history().is_empty());
        assert!(!sim.treatment_active());
        assert_eq!(sim.population().len(), 1000);
    }

    #[test]
    fn test_step_record() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 42, 28.0).unwrap();
        let record = sim.step();
        assert_eq!(record.step, 1);
        assert_eq!(record.iop, sim.current_iop());
        assert_eq!(record.total_alive_cells + record.total_dead_cells, 1000);
        assert!((0.0..=1.0).contains(&record.mortality_rate));
    }

    #[test]
    fn test_run_history_lengths() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 42, 15.0).unwrap();
        let records = sim.run(50, 10);
        assert_eq!(records.len(), 50);
        assert_eq!(sim.mortality_history().len(), 50);
        assert_eq!(sim.iop_history().len(), 51);
        assert_eq!(records.last().unwrap().step, 50);
    }

    #[test]
    fn test_start_step_offsets_counter() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 1, 15.0)
            .unwrap()
            .with_start_step(10);
        assert_eq!(sim.step().step, 11);
        assert_eq!(sim.summary().total_steps, 11);
    }

    #[test]
    fn test_step_counter_saturates() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 1, 15.0)
            .unwrap()
            .with_start_step(u32::MAX - 1);
        assert_eq!(sim.step().step, u32::MAX);
        assert_eq!(sim.step().step, u32::MAX);
        assert_eq!(sim.mortality_history().len(), 2);
    }

    #[test]
    fn test_apply_treatment_reduces_pressure() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 42, 15.0).unwrap();
        sim.set_current_iop(35.0);
        sim.apply_treatment(0.8);
        // 35 - (35 - 21) * 0.8
        assert!((sim.current_iop() - 23.8).abs() < 1e-9);
        assert!(sim.treatment_active());
    }

    #[test]
    fn test_treatment_floored_at_initial_iop() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 42, 28.0).unwrap();
        sim.set_current_iop(30.0);
        // 30 - (30 - 21) * 1.0 = 21, but the floor is the initial 28
        sim.apply_treatment(1.0);
        assert_eq!(sim.current_iop(), 28.0);
    }

    #[test]
    fn test_stop_treatment_keeps_pressure() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 42, 15.0).unwrap();
        sim.set_current_iop(35.0);
        sim.apply_treatment(0.5);
        let treated = sim.current_iop();
        sim.stop_treatment();
        assert!(!sim.treatment_active());
        assert_eq!(sim.current_iop(), treated);
    }

    #[test]
    fn test_summary_is_pure() {
        let mut sim = GlaucomaSimulator::from_seed(&small_config(), 3, 22.0).unwrap();
        sim.run(20, 0);
        let a = sim.summary();
        let b = sim.summary();
        assert_eq!(a, b);
        assert_eq!(a.total_steps, 20);
        assert!(a.min_iop <= a.mean_iop && a.mean_iop <= a.max_iop);
        assert_eq!(a.final_iop, *sim.iop_history().last().unwrap());
        assert_eq!(a.alive_cells + a.dead_cells, a.total_cells);
    }

    #[test]
    fn test_rejects_non_finite_initial_iop() {
        assert!(GlaucomaSimulator::from_seed(&small_config(), 0, f64::NAN).is_err());
    }
}
