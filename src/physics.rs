/*
 * Physics Module
 *
 * This module holds the per-agent update kernel. Each agent combines three
 * weighted rules into its velocity:
 * 1. Centering: drift toward the middle of the domain
 * 2. Matching: drift toward the average position of its own grid bin
 * 3. Avoidance: move away from its adversary
 * then the velocity is clamped to the speed limit, nudged back near the
 * domain edges and integrated into the position.
 *
 * Optimized for performance by:
 * - Reading only the agent's own bin aggregate instead of scanning neighbors
 * - Writing into a separate buffer so no agent waits on another
 * - Parallel processing over agents in thread-sized chunks
 */

use rayon::prelude::*;

use crate::agents::AgentBuffers;
use crate::params::{Domain, SimulationParams};
use crate::spatial_grid::BinAggregates;
use crate::MIN_DIRECTION_NORM;

// Rule weights and limits, copied out of the params once per step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub domain: Domain,
    pub center: (f32, f32),
    pub centering_factor: f32,
    pub matching_factor: f32,
    pub avoid_factor: f32,
    pub alignment_factor: f32,
    pub speed_limit: f32,
    pub margin: f32,
    pub turn_factor: f32,
}

impl KernelParams {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            domain: params.domain,
            center: params.domain.center(),
            centering_factor: params.centering_factor,
            matching_factor: params.matching_factor,
            avoid_factor: params.avoid_factor,
            alignment_factor: params.alignment_factor,
            speed_limit: params.speed_limit,
            margin: params.margin,
            turn_factor: params.turn_factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentState {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

// What an agent sees of the rest of the flock
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Neighborhood {
    pub bin_x: f32,
    pub bin_y: f32,
    pub bin_dx: f32,
    pub bin_dy: f32,
    pub adversary_x: f32,
    pub adversary_y: f32,
}

// Unit vector from (x1, y1) toward (x2, y2); zero when the points (nearly) coincide
#[inline]
pub fn compute_direction(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32) {
    let (ex, ey) = (x2 - x1, y2 - y1);
    let norm = (ex * ex + ey * ey).sqrt();
    if norm < MIN_DIRECTION_NORM {
        (0.0, 0.0)
    } else {
        (ex / norm, ey / norm)
    }
}

// Rescale to the limit when faster, keeping the heading
#[inline]
pub fn limit_speed(dx: f32, dy: f32, speed_limit: f32) -> (f32, f32) {
    let speed = (dx * dx + dy * dy).sqrt();
    if speed > speed_limit {
        let scale = speed_limit / speed;
        (dx * scale, dy * scale)
    } else {
        (dx, dy)
    }
}

// Soft walls: push back toward the interior inside the margin band
#[inline]
pub fn keep_in_the_box(x: f32, y: f32, dx: f32, dy: f32, kernel: &KernelParams) -> (f32, f32) {
    let d = &kernel.domain;
    let (mut dx, mut dy) = (dx, dy);
    if x < d.xmin + kernel.margin {
        dx += kernel.turn_factor;
    }
    if x > d.xmax - kernel.margin {
        dx -= kernel.turn_factor;
    }
    if y < d.ymin + kernel.margin {
        dy += kernel.turn_factor;
    }
    if y > d.ymax - kernel.margin {
        dy -= kernel.turn_factor;
    }
    (dx, dy)
}

pub fn update_agent(agent: AgentState, near: &Neighborhood, kernel: &KernelParams) -> AgentState {
    let AgentState { x, y, mut dx, mut dy } = agent;

    // Rule 1: centering
    dx += (kernel.center.0 - x) * kernel.centering_factor;
    dy += (kernel.center.1 - y) * kernel.centering_factor;

    // Rule 2: matching with the bin
    dx += (near.bin_x - x) * kernel.matching_factor;
    dy += (near.bin_y - y) * kernel.matching_factor;

    // Rule 3: avoidance
    let (dir_x, dir_y) = compute_direction(x, y, near.adversary_x, near.adversary_y);
    dx -= dir_x * kernel.avoid_factor;
    dy -= dir_y * kernel.avoid_factor;

    // Optional alignment with the bin's average velocity
    dx += (near.bin_dx - agent.dx) * kernel.alignment_factor;
    dy += (near.bin_dy - agent.dy) * kernel.alignment_factor;

    let (dx, dy) = limit_speed(dx, dy, kernel.speed_limit);
    let (dx, dy) = keep_in_the_box(x, y, dx, dy, kernel);

    AgentState { x: x + dx, y: y + dy, dx, dy }
}

// Advance every agent one step, reading `current` and writing `next`
pub fn update_positions(
    current: &AgentBuffers,
    adversary: &[u32],
    bin: &[u32],
    aggregates: &BinAggregates,
    next: &mut AgentBuffers,
    kernel: &KernelParams,
    parallel: bool,
) {
    debug_assert_eq!(current.len(), next.len());

    let step = |(i, (((x, y), dx), dy)): (usize, (((&mut f32, &mut f32), &mut f32), &mut f32))| {
        let agent = AgentState {
            x: current.x[i],
            y: current.y[i],
            dx: current.dx[i],
            dy: current.dy[i],
        };
        let b = bin[i] as usize;
        let e = adversary[i] as usize;
        let near = Neighborhood {
            bin_x: aggregates.x[b],
            bin_y: aggregates.y[b],
            bin_dx: aggregates.dx[b],
            bin_dy: aggregates.dy[b],
            adversary_x: current.x[e],
            adversary_y: current.y[e],
        };
        let updated = update_agent(agent, &near, kernel);
        *x = updated.x;
        *y = updated.y;
        *dx = updated.dx;
        *dy = updated.dy;
    };

    if parallel {
        // Hand rayon thread-sized chunks to keep scheduling overhead low
        let chunk_size = std::cmp::max(current.len() / rayon::current_num_threads(), 1);
        next.x
            .par_iter_mut()
            .zip(next.y.par_iter_mut())
            .zip(next.dx.par_iter_mut())
            .zip(next.dy.par_iter_mut())
            .enumerate()
            .with_min_len(chunk_size)
            .for_each(step);
    } else {
        next.x
            .iter_mut()
            .zip(next.y.iter_mut())
            .zip(next.dx.iter_mut())
            .zip(next.dy.iter_mut())
            .enumerate()
            .for_each(step);
    }
}

// Mean velocity over the whole flock, (0, 0) when empty. The sequential sum
// has a fixed order, so it is bit-reproducible across runs.
pub fn average_velocity(buffers: &AgentBuffers, parallel: bool) -> (f32, f32) {
    if buffers.is_empty() {
        return (0.0, 0.0);
    }
    let n = buffers.len() as f64;
    let (sum_dx, sum_dy): (f64, f64) = if parallel {
        (
            buffers.dx.par_iter().map(|&v| v as f64).sum(),
            buffers.dy.par_iter().map(|&v| v as f64).sum(),
        )
    } else {
        (
            buffers.dx.iter().map(|&v| v as f64).sum(),
            buffers.dy.iter().map(|&v| v as f64).sum(),
        )
    };
    ((sum_dx / n) as f32, (sum_dy / n) as f32)
}
