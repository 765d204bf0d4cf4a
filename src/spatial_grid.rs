/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct that turns neighbor aggregation
 * from O(n^2) into O(n + bins). The domain is divided into a fixed
 * nbox_x * nbox_y grid; every step each agent is assigned to a bin, the bins
 * accumulate count / position sum / velocity sum, the agents are sorted into
 * bin order and an exclusive scan gives the first sorted slot of every bin.
 *
 * Optimized for performance by:
 * - Accumulating into per-bin atomics so the agent pass runs in parallel
 * - Reusing every per-step array (accumulators, averages, permutation)
 * - Skipping the sort when all agents share one bin
 */

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::agents::AgentStore;
use crate::params::{Domain, SimulationParams};

// Grid geometry: domain bounds plus resolution along each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub domain: Domain,
    pub nbox_x: u32,
    pub nbox_y: u32,
}

impl GridSpec {
    pub fn new(domain: Domain, nbox_x: u32, nbox_y: u32) -> Self {
        Self { domain, nbox_x: nbox_x.max(1), nbox_y: nbox_y.max(1) }
    }

    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(params.domain, params.nbox_x as u32, params.nbox_y as u32)
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.nbox_x as usize * self.nbox_y as usize
    }

    // Floor-based cell index along one axis, clamped so rounding at the
    // upper boundary (or a stray position) still lands in a valid cell
    #[inline]
    fn axis_index(coord: f32, min: f32, max: f32, nbox: u32) -> u32 {
        let cell = ((coord - min) / (max - min) * nbox as f32).floor() as i64;
        cell.clamp(0, nbox as i64 - 1) as u32
    }

    // Convert a position to its bin id, i + nbox_x * j
    #[inline]
    pub fn bin_of(&self, x: f32, y: f32) -> u32 {
        let d = &self.domain;
        let i = Self::axis_index(x, d.xmin, d.xmax, self.nbox_x);
        let j = Self::axis_index(y, d.ymin, d.ymax, self.nbox_y);
        i + self.nbox_x * j
    }

    #[inline]
    pub fn cell_coords(&self, bin: u32) -> (u32, u32) {
        (bin % self.nbox_x, bin / self.nbox_x)
    }
}

// f32 accumulator built on the bit pattern of an AtomicU32
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn zero() -> Self {
        Self(AtomicU32::new(0.0f32.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn reset(&self) {
        self.0.store(0.0f32.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    fn fetch_add(&self, value: f32) {
        // The closure always returns Some, so there is no Err arm to handle
        self.0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f32::from_bits(bits) + value).to_bits())
            })
            .ok();
    }
}

// Concurrent per-bin sums, written by many agents within one phase
struct BinAccumulator {
    count: Vec<AtomicU32>,
    sum_x: Vec<AtomicF32>,
    sum_y: Vec<AtomicF32>,
    sum_dx: Vec<AtomicF32>,
    sum_dy: Vec<AtomicF32>,
}

impl BinAccumulator {
    fn new(num_bins: usize) -> Self {
        Self {
            count: (0..num_bins).map(|_| AtomicU32::new(0)).collect(),
            sum_x: (0..num_bins).map(|_| AtomicF32::zero()).collect(),
            sum_y: (0..num_bins).map(|_| AtomicF32::zero()).collect(),
            sum_dx: (0..num_bins).map(|_| AtomicF32::zero()).collect(),
            sum_dy: (0..num_bins).map(|_| AtomicF32::zero()).collect(),
        }
    }

    fn reset(&self) {
        (0..self.count.len()).into_par_iter().for_each(|b| {
            self.count[b].store(0, Ordering::Relaxed);
            self.sum_x[b].reset();
            self.sum_y[b].reset();
            self.sum_dx[b].reset();
            self.sum_dy[b].reset();
        });
    }

    #[inline]
    fn add(&self, bin: usize, x: f32, y: f32, dx: f32, dy: f32) {
        self.count[bin].fetch_add(1, Ordering::Relaxed);
        self.sum_x[bin].fetch_add(x);
        self.sum_y[bin].fetch_add(y);
        self.sum_dx[bin].fetch_add(dx);
        self.sum_dy[bin].fetch_add(dy);
    }
}

// Finalized per-bin data: population and average position / velocity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinAggregates {
    pub count: Vec<u32>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub dx: Vec<f32>,
    pub dy: Vec<f32>,
}

impl BinAggregates {
    pub fn zeroed(num_bins: usize) -> Self {
        Self {
            count: vec![0; num_bins],
            x: vec![0.0; num_bins],
            y: vec![0.0; num_bins],
            dx: vec![0.0; num_bins],
            dy: vec![0.0; num_bins],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.count.iter().map(|&c| c as u64).sum()
    }

    pub fn occupied_bins(&self) -> usize {
        self.count.iter().filter(|&&c| c > 0).count()
    }

    pub fn max_count(&self) -> u32 {
        self.count.iter().copied().max().unwrap_or(0)
    }
}

pub struct SpatialGrid {
    pub spec: GridSpec,
    accumulator: BinAccumulator,
    aggregates: BinAggregates,
    // Exclusive scan of bin counts: first sorted slot of every bin
    box_index: Vec<u32>,
    permutation: Vec<u32>,
}

impl SpatialGrid {
    pub fn new(spec: GridSpec, num_boids: usize) -> Self {
        let num_bins = spec.num_bins();
        Self {
            spec,
            accumulator: BinAccumulator::new(num_bins),
            aggregates: BinAggregates::zeroed(num_bins),
            box_index: vec![0; num_bins],
            permutation: (0..num_boids as u32).collect(),
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.spec.num_bins()
    }

    pub fn aggregates(&self) -> &BinAggregates {
        &self.aggregates
    }

    pub fn box_index(&self) -> &[u32] {
        &self.box_index
    }

    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    // Sorted slots occupied by one bin, valid after compute_box_index
    pub fn bin_range(&self, bin: usize) -> Range<usize> {
        let start = self.box_index[bin] as usize;
        start..start + self.aggregates.count[bin] as usize
    }

    // Assign every agent to its bin and rebuild the per-bin averages from scratch
    pub fn compute_aggregates(&mut self, agents: &mut AgentStore, parallel: bool) {
        let spec = self.spec;
        let accumulator = &self.accumulator;
        accumulator.reset();

        let current = &agents.current;
        let assign = |(i, bin_out): (usize, &mut u32)| {
            let (x, y) = (current.x[i], current.y[i]);
            let bin = spec.bin_of(x, y);
            *bin_out = bin;
            accumulator.add(bin as usize, x, y, current.dx[i], current.dy[i]);
        };
        if parallel {
            agents.bin.par_iter_mut().enumerate().for_each(assign);
        } else {
            agents.bin.iter_mut().enumerate().for_each(assign);
        }

        let aggregates = &mut self.aggregates;
        aggregates
            .count
            .par_iter_mut()
            .zip(aggregates.x.par_iter_mut())
            .zip(aggregates.y.par_iter_mut())
            .zip(aggregates.dx.par_iter_mut())
            .zip(aggregates.dy.par_iter_mut())
            .enumerate()
            .for_each(|(b, ((((count, x), y), dx), dy))| {
                let n = accumulator.count[b].load(Ordering::Relaxed);
                *count = n;
                if n > 0 {
                    let inv = 1.0 / n as f32;
                    *x = accumulator.sum_x[b].load() * inv;
                    *y = accumulator.sum_y[b].load() * inv;
                    *dx = accumulator.sum_dx[b].load() * inv;
                    *dy = accumulator.sum_dy[b].load() * inv;
                } else {
                    *x = 0.0;
                    *y = 0.0;
                    *dx = 0.0;
                    *dy = 0.0;
                }
            });
    }

    // Permutation grouping agents by ascending bin id
    pub fn sort_by_bin(&mut self, bin: &[u32]) -> &[u32] {
        let n = bin.len();
        self.permutation.resize(n, 0);
        self.permutation
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, p)| *p = i as u32);

        let min = bin.par_iter().copied().min();
        let max = bin.par_iter().copied().max();

        // All agents in one bin: already sorted, keep the identity
        if min == max {
            return &self.permutation;
        }

        self.permutation.par_sort_by_key(|&i| bin[i as usize]);
        &self.permutation
    }

    pub fn compute_box_index(&mut self) -> u32 {
        prefix_sum(&self.aggregates.count, &mut self.box_index)
    }

    // Bin, aggregate, sort and scan, then put the agents in bin order
    pub fn rebuild(&mut self, agents: &mut AgentStore, parallel: bool) {
        self.compute_aggregates(agents, parallel);
        self.sort_by_bin(&agents.bin);
        let total = self.compute_box_index();
        debug_assert_eq!(total as usize, agents.len());
        agents.permute(&self.permutation);
    }
}

// scratch[i] = array[permutation[i]], then the caller's array becomes the permuted data
pub fn apply_permutation<T: Copy + Send + Sync>(
    array: &mut Vec<T>,
    scratch: &mut Vec<T>,
    permutation: &[u32],
) {
    debug_assert_eq!(permutation.len(), array.len());
    if scratch.len() != array.len() {
        scratch.clear();
        scratch.extend_from_slice(array);
    }
    let source = &*array;
    scratch
        .par_iter_mut()
        .zip(permutation.par_iter())
        .for_each(|(slot, &p)| *slot = source[p as usize]);
    std::mem::swap(array, scratch);
}

// Exclusive scan of per-bin counts; returns the total population
pub fn prefix_sum(count: &[u32], box_index: &mut [u32]) -> u32 {
    let mut running = 0u32;
    for (slot, &c) in box_index.iter_mut().zip(count) {
        *slot = running;
        running += c;
    }
    running
}
