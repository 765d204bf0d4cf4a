/*
 * Simulation Module
 *
 * This module defines the Simulation struct that owns the whole state of a
 * run (agents, grid, random source) and advances it one step at a time.
 * Every step runs the same barrier-separated phases:
 * 1. Bin every agent and rebuild the per-bin aggregates
 * 2. Sort agents into bin order and compute the bin offsets
 * 3. Apply the permutation to every per-agent array
 * 4. Run the update kernel from the current into the next buffers
 * 5. Swap the buffers
 * 6. Every `refresh_interval` steps, reassign some adversaries
 */

use tracing::{debug, trace};

use crate::adversary;
use crate::agents::AgentStore;
use crate::debug::StepStats;
use crate::error::ConfigError;
use crate::params::SimulationParams;
use crate::physics::{self, KernelParams};
use crate::random::RandomSource;
use crate::spatial_grid::{GridSpec, SpatialGrid};

pub struct Simulation {
    pub params: SimulationParams,
    pub agents: AgentStore,
    pub grid: SpatialGrid,
    random: RandomSource,
    kernel: KernelParams,
    step: u64,
    stats: Option<StepStats>,
}

impl Simulation {
    // Random initial flock: positions, velocities, then a full adversary draw
    pub fn new(params: SimulationParams) -> Result<Self, ConfigError> {
        params.validate()?;

        let mut random = RandomSource::new(params.seed);
        let mut agents = AgentStore::new(params.num_boids);
        agents.init_positions(&params.domain, params.initial_speed, random.begin_epoch());
        let reassigned = adversary::refresh(&mut agents.adversary, &mut random, 1.0);

        debug!(
            num_boids = params.num_boids,
            bins = params.num_bins(),
            seed = params.seed,
            reassigned,
            "initialized flock"
        );
        Ok(Self::assemble(params, agents, random))
    }

    // Start from an explicit agent layout; `num_boids` follows the store
    pub fn with_agents(mut params: SimulationParams, agents: AgentStore) -> Result<Self, ConfigError> {
        params.num_boids = agents.len();
        params.validate()?;
        let random = RandomSource::new(params.seed);
        Ok(Self::assemble(params, agents, random))
    }

    fn assemble(params: SimulationParams, agents: AgentStore, random: RandomSource) -> Self {
        let grid = SpatialGrid::new(GridSpec::from_params(&params), agents.len());
        let kernel = KernelParams::from_params(&params);
        Self {
            params,
            agents,
            grid,
            random,
            kernel,
            step: 0,
            stats: None,
        }
    }

    pub fn step(&mut self) {
        let parallel = self.params.enable_parallel;

        self.grid.rebuild(&mut self.agents, parallel);

        let view = self.agents.split();
        physics::update_positions(
            view.current,
            view.adversary,
            view.bin,
            self.grid.aggregates(),
            view.next,
            &self.kernel,
            parallel,
        );
        self.agents.swap();

        let index = self.step;
        self.step += 1;

        // Zero on steps without a refresh
        let interval = self.params.refresh_interval;
        let reassigned = if interval > 0 && index % interval == 0 {
            adversary::refresh(&mut self.agents.adversary, &mut self.random, self.params.refresh_rate)
        } else {
            0
        };

        if self.params.collect_stats {
            let mut stats = StepStats::from_aggregates(index, self.grid.aggregates());
            stats.reassigned = reassigned;
            stats.average_velocity = physics::average_velocity(&self.agents.current, parallel);
            debug!(
                step = stats.step,
                occupied_bins = stats.occupied_bins,
                max_bin_count = stats.max_bin_count,
                reassigned = stats.reassigned,
                avg_dx = stats.average_velocity.0,
                avg_dy = stats.average_velocity.1,
                "step stats"
            );
            self.stats = Some(stats);
        }
        trace!(step = index, "step complete");
    }

    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    // Steps taken so far
    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn stats(&self) -> Option<&StepStats> {
        self.stats.as_ref()
    }

    pub fn positions(&self) -> (&[f32], &[f32]) {
        (&self.agents.current.x, &self.agents.current.y)
    }

    pub fn velocities(&self) -> (&[f32], &[f32]) {
        (&self.agents.current.dx, &self.agents.current.dy)
    }

    pub fn copy_positions_for_rendering(&self, xy: &mut Vec<f32>) {
        self.agents.copy_positions_for_rendering(xy);
    }
}
