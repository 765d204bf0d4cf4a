/*
 * Boid Simulation Benchmark
 *
 * Benchmarks for the binned boid simulation. It measures the grid rebuild
 * (binning, aggregation, sort and permutation), the update kernel on its own,
 * and the full step, at several population sizes.
 */

use binned_boids::physics::{self, KernelParams};
use binned_boids::{AgentBuffers, AgentStore, GridSpec, Simulation, SimulationParams, SpatialGrid};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const POPULATIONS: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];

fn random_store(n: usize, params: &SimulationParams) -> AgentStore {
    let mut rng = SmallRng::seed_from_u64(0xBEEF);
    let d = params.domain;
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut dx = Vec::with_capacity(n);
    let mut dy = Vec::with_capacity(n);
    let mut adversary = Vec::with_capacity(n);
    for _ in 0..n {
        x.push(rng.gen_range(d.xmin..d.xmax));
        y.push(rng.gen_range(d.ymin..d.ymax));
        dx.push(rng.gen_range(-1.0..1.0));
        dy.push(rng.gen_range(-1.0..1.0));
        adversary.push(rng.gen_range(0..n as u32));
    }
    AgentStore::from_state(x, y, dx, dy, adversary).expect("consistent agent arrays")
}

fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    let params = SimulationParams::default();

    for &n in POPULATIONS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut agents = random_store(n, &params);
            let mut grid = SpatialGrid::new(GridSpec::from_params(&params), n);
            b.iter(|| {
                grid.rebuild(&mut agents, true);
                black_box(grid.box_index());
            });
        });
    }

    group.finish();
}

fn bench_update_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_kernel");
    let params = SimulationParams::default();
    let kernel = KernelParams::from_params(&params);

    for &n in POPULATIONS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut agents = random_store(n, &params);
            let mut grid = SpatialGrid::new(GridSpec::from_params(&params), n);
            grid.rebuild(&mut agents, true);
            let mut next = AgentBuffers::zeroed(n);
            b.iter(|| {
                physics::update_positions(
                    &agents.current,
                    &agents.adversary,
                    &agents.bin,
                    grid.aggregates(),
                    &mut next,
                    &kernel,
                    true,
                );
                black_box(&next);
            });
        });
    }

    group.finish();
}

fn bench_full_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_step");

    for &n in POPULATIONS.iter() {
        for parallel in [true, false] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                let params = SimulationParams {
                    num_boids: n,
                    enable_parallel: parallel,
                    ..SimulationParams::default()
                };
                let mut simulation = Simulation::new(params).expect("valid parameters");
                b.iter(|| {
                    simulation.step();
                    black_box(simulation.step_count());
                });
            });
        }
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_spatial_grid, bench_update_kernel, bench_full_step
}

criterion_main!(benches);
