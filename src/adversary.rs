/*
 * Adversary Assignment Module
 *
 * Every agent steers away from one other agent, its adversary. Rivalries are
 * refreshed at a slower cadence than positions: each refresh gives a random
 * fraction of the population a new, uniformly drawn adversary and leaves the
 * rest untouched.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::random::RandomSource;

// Reassign roughly `rate` of the agents; returns how many were reassigned
pub fn refresh(adversary: &mut [u32], random: &mut RandomSource, rate: f32) -> usize {
    // NaN compares false everywhere, treat it as "no refresh"
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    let epoch = random.begin_epoch();

    let num_boids = adversary.len() as u32;
    if num_boids == 0 {
        return 0;
    }

    let reassigned = AtomicUsize::new(0);
    adversary.par_iter_mut().enumerate().for_each(|(i, target)| {
        let mut rng = epoch.stream(i);
        if rng.unit() < rate {
            *target = rng.index_below(num_boids);
            reassigned.fetch_add(1, Ordering::Relaxed);
        }
    });

    let reassigned = reassigned.into_inner();
    debug!(epoch = epoch.index(), rate, reassigned, "refreshed adversaries");
    reassigned
}
