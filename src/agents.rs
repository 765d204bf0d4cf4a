/*
 * Agent Store Module
 *
 * Structure-of-arrays storage for every agent: one flat array per attribute
 * (x, y, dx, dy, adversary, bin). Kinematic state is double-buffered: the
 * update kernel reads `current` and writes `next`, then the two are swapped
 * by ownership exchange. Scratch arrays used by the bin-order permutation are
 * allocated once here and reused every step.
 */

use rayon::prelude::*;

use crate::error::ConfigError;
use crate::params::Domain;
use crate::random::Epoch;
use crate::spatial_grid::apply_permutation;

// Position and velocity arrays for one time level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentBuffers {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub dx: Vec<f32>,
    pub dy: Vec<f32>,
}

impl AgentBuffers {
    pub fn zeroed(num_boids: usize) -> Self {
        Self {
            x: vec![0.0; num_boids],
            y: vec![0.0; num_boids],
            dx: vec![0.0; num_boids],
            dy: vec![0.0; num_boids],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

// Borrowed views handed to the update kernel for one step
pub struct StepBuffers<'a> {
    pub current: &'a AgentBuffers,
    pub adversary: &'a [u32],
    pub bin: &'a [u32],
    pub next: &'a mut AgentBuffers,
}

pub struct AgentStore {
    pub current: AgentBuffers,
    next: AgentBuffers,
    // Index of the agent each agent steers away from
    pub adversary: Vec<u32>,
    // Grid bin of each agent, rewritten at the top of every step
    pub bin: Vec<u32>,
    scratch_f32: Vec<f32>,
    scratch_u32: Vec<u32>,
    inverse: Vec<u32>,
}

impl AgentStore {
    pub fn new(num_boids: usize) -> Self {
        Self {
            current: AgentBuffers::zeroed(num_boids),
            next: AgentBuffers::zeroed(num_boids),
            adversary: vec![0; num_boids],
            bin: vec![0; num_boids],
            scratch_f32: vec![0.0; num_boids],
            scratch_u32: vec![0; num_boids],
            inverse: vec![0; num_boids],
        }
    }

    // Build a store from explicit state; adversaries must index into the population
    pub fn from_state(
        x: Vec<f32>,
        y: Vec<f32>,
        dx: Vec<f32>,
        dy: Vec<f32>,
        adversary: Vec<u32>,
    ) -> Result<Self, ConfigError> {
        let n = x.len();
        if y.len() != n || dx.len() != n || dy.len() != n || adversary.len() != n {
            return Err(ConfigError::Invalid("agent arrays must all have the same length"));
        }
        if adversary.iter().any(|&a| a as usize >= n) {
            return Err(ConfigError::Invalid("adversary index out of range"));
        }

        let mut store = Self::new(n);
        store.current = AgentBuffers { x, y, dx, dy };
        store.adversary = adversary;
        Ok(store)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    // Random positions inside the domain and small random velocities, one stream per agent
    pub fn init_positions(&mut self, domain: &Domain, initial_speed: f32, epoch: Epoch) {
        let current = &mut self.current;
        current
            .x
            .par_iter_mut()
            .zip(current.y.par_iter_mut())
            .zip(current.dx.par_iter_mut())
            .zip(current.dy.par_iter_mut())
            .enumerate()
            .for_each(|(i, (((x, y), dx), dy))| {
                let mut rng = epoch.stream(i);
                *x = rng.uniform(domain.xmin, domain.xmax);
                *y = rng.uniform(domain.ymin, domain.ymax);
                *dx = rng.uniform(-initial_speed, initial_speed);
                *dy = rng.uniform(-initial_speed, initial_speed);
            });
    }

    // Read view of this step and write view of the next; the borrows never alias
    #[inline]
    pub fn split(&mut self) -> StepBuffers<'_> {
        StepBuffers {
            current: &self.current,
            adversary: &self.adversary,
            bin: &self.bin,
            next: &mut self.next,
        }
    }

    // Make the freshly written buffers current
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    // Reorder every per-agent array with the same permutation. Adversary values
    // are old indices, so they are mapped through the inverse afterwards.
    pub fn permute(&mut self, permutation: &[u32]) {
        debug_assert_eq!(permutation.len(), self.len());

        apply_permutation(&mut self.current.x, &mut self.scratch_f32, permutation);
        apply_permutation(&mut self.current.y, &mut self.scratch_f32, permutation);
        apply_permutation(&mut self.current.dx, &mut self.scratch_f32, permutation);
        apply_permutation(&mut self.current.dy, &mut self.scratch_f32, permutation);
        apply_permutation(&mut self.bin, &mut self.scratch_u32, permutation);
        apply_permutation(&mut self.adversary, &mut self.scratch_u32, permutation);

        for (new_index, &old_index) in permutation.iter().enumerate() {
            self.inverse[old_index as usize] = new_index as u32;
        }
        let inverse = &self.inverse;
        self.adversary
            .par_iter_mut()
            .for_each(|a| *a = inverse[*a as usize]);
    }

    // Interleaved [x0, y0, x1, y1, ...] copy for a renderer
    pub fn copy_positions_for_rendering(&self, xy: &mut Vec<f32>) {
        xy.clear();
        xy.reserve(2 * self.len());
        xy.extend(
            self.current
                .x
                .iter()
                .zip(&self.current.y)
                .flat_map(|(&x, &y)| [x, y]),
        );
    }
}
