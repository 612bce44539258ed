use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use retinasim_core::config::SimulationConfig;
use retinasim_core::engine::GlaucomaSimulator;

fn bench_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator_step");
    let config = SimulationConfig::default();

    for &iop in &[15.0, 28.0, 38.0] {
        group.bench_function(format!("10k_cells_iop{}_50_steps", iop), |b| {
            b.iter_batched(
                || GlaucomaSimulator::from_seed(&config, 42, iop).expect("default config is valid"),
                |mut sim| sim.run(50, 0),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let config = SimulationConfig::default();
    c.bench_function("generate_10k_cells", |b| {
        b.iter(|| GlaucomaSimulator::from_seed(&config, 7, 15.0).expect("default config is valid"))
    });
}

criterion_group!(benches, bench_steps, bench_generation);
criterion_main!(benches);
