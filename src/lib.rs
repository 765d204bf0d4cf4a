/*
 * Binned Boid Flocking Simulation - Module Definitions
 *
 * This file defines the module structure for the simulation library.
 * Agents live in structure-of-arrays buffers, a fixed grid bins them each
 * step, and the update kernel reads only the agent's own bin aggregate.
 */

// Re-export key components for easier access
pub use agents::{AgentBuffers, AgentStore};
pub use debug::StepStats;
pub use error::ConfigError;
pub use params::{Domain, SimulationParams};
pub use random::RandomSource;
pub use simulation::Simulation;
pub use spatial_grid::{BinAggregates, GridSpec, SpatialGrid};

// Define modules
pub mod adversary;
pub mod agents;
pub mod debug;
pub mod error;
pub mod params;
pub mod physics;
pub mod random;
pub mod simulation;
pub mod spatial_grid;

// Constants
pub const WORLD_SIZE: f32 = 150.0;
pub const GRID_RESOLUTION: usize = 10;
// Below this distance the avoidance direction is taken as zero
pub const MIN_DIRECTION_NORM: f32 = 1e-6;
