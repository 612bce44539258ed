//! RetinaSim Scenario Runner
//!
//! Runs the default patient scenarios headless, prints a comparison and
//! predictions, and writes a JSON report plus a bincode snapshot per
//! scenario.
//!
//! Usage:
//!   cargo run -p retinasim-runner
//!   cargo run -p retinasim-runner -- --verbose --steps 500
//!   cargo run -p retinasim-runner -- --config retina.json --out results
//!   cargo run -p retinasim-runner -- --train --model models/glaucoma_model.json

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use retinasim_core::config::{RunConfig, Scenario, SimulationConfig};
use retinasim_core::engine::GlaucomaSimulator;
use retinasim_core::persistence::save_snapshot;
use retinasim_core::predictor::{
    generate_synthetic_data, select_predictor, LearnedPredictor, ModelConfig, Predictor,
    TrainingConfig,
};
use retinasim_core::report::{comparison_table, health_histogram, results_file_name, write_json, ScenarioReport};

const TRAINING_SAMPLES: usize = 1000;
const TRAINING_EPOCHS: usize = 10;

// ── Command line ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Args {
    verbose: bool,
    steps: Option<u32>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    model: Option<PathBuf>,
    train: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" => args.verbose = true,
            "--train" => args.train = true,
            "--steps" => {
                let value = iter.next().context("--steps needs a value")?;
                args.steps = Some(value.parse().with_context(|| format!("invalid --steps '{}'", value))?);
            }
            "--seed" => {
                let value = iter.next().context("--seed needs a value")?;
                args.seed = Some(value.parse().with_context(|| format!("invalid --seed '{}'", value))?);
            }
            "--config" => args.config = Some(iter.next().context("--config needs a path")?.into()),
            "--out" => args.out = Some(iter.next().context("--out needs a path")?.into()),
            "--model" => args.model = Some(iter.next().context("--model needs a path")?.into()),
            other => bail!("unknown argument '{}'", other),
        }
    }
    Ok(args)
}

// ── Sanity checks ───────────────────────────────────────────────────────

struct CheckResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check_report(report: &ScenarioReport) -> Vec<CheckResult> {
    let s = &report.summary;
    let mut results = Vec::new();

    results.push(CheckResult {
        name: format!("{}: cell_conservation", report.label),
        passed: s.alive_cells + s.dead_cells == s.total_cells,
        detail: format!("{} alive + {} dead of {}", s.alive_cells, s.dead_cells, s.total_cells),
    });

    let monotonic = report
        .steps
        .windows(2)
        .all(|w| w[1].total_dead_cells >= w[0].total_dead_cells);
    results.push(CheckResult {
        name: format!("{}: deaths_monotonic", report.label),
        passed: monotonic,
        detail: format!("{} steps", report.steps.len()),
    });

    results.push(CheckResult {
        name: format!("{}: mortality_in_range", report.label),
        passed: (0.0..=1.0).contains(&s.final_mortality_rate),
        detail: format!("{:.4}", s.final_mortality_rate),
    });

    results
}

// ── Scenario execution ──────────────────────────────────────────────────

fn run_scenario(
    scenario: &Scenario,
    config: &SimulationConfig,
    run: &RunConfig,
    predictor: &dyn Predictor,
) -> Result<(GlaucomaSimulator, ScenarioReport)> {
    let seed = scenario.seed(run.base_seed);
    let mut sim = GlaucomaSimulator::from_seed(config, seed, scenario.initial_iop)
        .with_context(|| format!("building scenario '{}'", scenario.label))?;

    log::info!(
        "[{}] Initial IOP {:.1} mmHg, {} cells, seed {}",
        scenario.label,
        scenario.initial_iop,
        sim.population().len(),
        seed
    );

    // Treatment starts after the step whose zero-based index equals treatment_at
    let steps = match scenario.treatment_at {
        Some(at) if at < run.num_steps => {
            let mut steps = sim.run(at + 1, run.log_interval);
            sim.apply_treatment(scenario.treatment_effectiveness);
            println!(
                "  [{}] Treatment started at step {} (IOP: {:.1} mmHg)",
                scenario.label,
                at,
                sim.current_iop()
            );
            steps.extend(sim.run(run.num_steps - at - 1, run.log_interval));
            steps
        }
        _ => sim.run(run.num_steps, run.log_interval),
    };

    let report = ScenarioReport::new(scenario, seed, &sim, predictor, steps);
    Ok((sim, report))
}

fn build_predictor(args: &Args, results_dir: &Path, seed: u64) -> Result<Box<dyn Predictor>> {
    let mut learned = None;

    if args.train {
        let mut rng = StdRng::seed_from_u64(seed);
        let model_config = ModelConfig::default();
        let data = generate_synthetic_data(TRAINING_SAMPLES, model_config.input_size, &mut rng);
        let mut model = LearnedPredictor::new(&model_config, &mut rng);
        let training = TrainingConfig {
            epochs: TRAINING_EPOCHS,
            ..TrainingConfig::default()
        };
        let history = model.train(&data, &training, &mut rng);
        log::info!(
            "Trained model for {} epochs, final loss {:.4}, validation loss {:.4}",
            training.epochs,
            history.loss.last().copied().unwrap_or(f64::NAN),
            history.val_loss.last().copied().unwrap_or(f64::NAN)
        );

        let path = args
            .model
            .clone()
            .unwrap_or_else(|| results_dir.join("glaucoma_model.json"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        model.save(BufWriter::new(File::create(&path)?))?;
        println!("  Model trained and saved to {}", path.display());
        learned = Some(model);
    } else if let Some(path) = &args.model {
        match File::open(path).map_err(Into::into).and_then(|f| LearnedPredictor::load(BufReader::new(f))) {
            Ok(model) => {
                log::info!("Loaded learned model from {}", path.display());
                learned = Some(model);
            }
            Err(e) => log::warn!("Could not load model {}: {}", path.display(), e),
        }
    }

    Ok(select_predictor(learned))
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    println!("=== RetinaSim: 3D Retina Glaucoma Simulation ===\n");

    let config = match &args.config {
        Some(path) => SimulationConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    config.validate()?;

    let mut run = RunConfig::default();
    if let Some(steps) = args.steps {
        run.num_steps = steps;
    }
    if let Some(seed) = args.seed {
        run.base_seed = seed;
    }
    if let Some(out) = &args.out {
        run.results_dir = out.clone();
    }
    fs::create_dir_all(&run.results_dir)?;

    println!("  Cells per simulation: {}", config.retina.total_cells);
    println!("  Steps per simulation: {}", run.num_steps);

    let predictor = build_predictor(&args, &run.results_dir, run.base_seed)?;
    println!("  Predictor: {}\n", predictor.name());

    // ── Scenarios ──
    let mut reports = Vec::new();
    for scenario in Scenario::default_set() {
        let (sim, report) = run_scenario(&scenario, &config, &run, predictor.as_ref())?;

        let stem = results_file_name(&scenario.label);
        write_json(run.results_dir.join(&stem), &report)?;

        let snapshot_path = run.results_dir.join(stem.replace(".json", ".snapshot.bin"));
        save_snapshot(BufWriter::new(File::create(&snapshot_path)?), &sim, &scenario.label)?;

        if args.verbose {
            let hist = health_histogram(sim.population(), 10);
            println!("  [{}] Health histogram (10 bins): {:?}", scenario.label, hist);
        }
        reports.push(report);
    }

    // ── Comparison ──
    println!("\n--- Comparative Summary ---");
    print!("{}", comparison_table(&reports));

    // ── Checks ──
    let results: Vec<CheckResult> = reports.iter().flat_map(check_report).collect();
    let failed = results.iter().filter(|r| !r.passed).count();
    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {} scenarios written to {}, {}/{} checks passed ===",
        reports.len(),
        run.results_dir.display(),
        results.len() - failed,
        results.len()
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
