/*
 * Binned Boid Flocking Simulation
 *
 * Headless driver: loads the parameters (from the JSON file named by the
 * BOIDS_CONFIG environment variable, or the defaults), builds the flock and
 * runs it for the configured number of steps. Log verbosity follows RUST_LOG.
 */

use binned_boids::{ConfigError, Simulation, SimulationParams};
use tracing::info;

fn main() -> Result<(), ConfigError> {
    init_tracing();

    let params = load_params()?;
    let steps = params.num_iterations;
    let mut simulation = Simulation::new(params)?;

    info!(
        num_boids = simulation.params.num_boids,
        steps,
        "starting simulation"
    );
    simulation.run(steps);

    let (x, y) = simulation.positions();
    let n = x.len().max(1) as f32;
    let centroid = (x.iter().sum::<f32>() / n, y.iter().sum::<f32>() / n);
    info!(
        steps = simulation.step_count(),
        centroid_x = centroid.0,
        centroid_y = centroid.1,
        "simulation finished"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_params() -> Result<SimulationParams, ConfigError> {
    match std::env::var_os("BOIDS_CONFIG") {
        Some(path) => {
            info!(path = ?path, "loading configuration");
            SimulationParams::from_json_file(path)
        }
        None => Ok(SimulationParams::default()),
    }
}
