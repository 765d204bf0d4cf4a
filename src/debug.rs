/*
 * Debug Information Module
 *
 * This module defines the StepStats struct, a snapshot of diagnostics for
 * the most recent step. It is only filled in when `collect_stats` is set.
 *
 * Includes metrics for:
 * - Step number
 * - Grid occupancy (bins in use, most crowded bin)
 * - Agents reassigned by the latest adversary refresh
 * - Flock-wide average velocity
 */

use crate::spatial_grid::BinAggregates;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    pub step: u64,
    pub occupied_bins: usize,
    pub max_bin_count: u32,
    pub binned_agents: u64,
    pub reassigned: usize,
    pub average_velocity: (f32, f32),
}

impl StepStats {
    pub fn from_aggregates(step: u64, aggregates: &BinAggregates) -> Self {
        Self {
            step,
            occupied_bins: aggregates.occupied_bins(),
            max_bin_count: aggregates.max_count(),
            binned_agents: aggregates.total_count(),
            ..Self::default()
        }
    }
}
