/*
 * Random Source Module
 *
 * Supplies independent, reproducible random streams to agents that are
 * processed concurrently. Every stream is derived from (seed, epoch, agent
 * index): each logical operation (initial placement, an adversary refresh)
 * opens a new epoch, and agent i of that operation always receives the same
 * stream no matter which thread runs it or in which order.
 */

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// SplitMix64 finalizer, used to decorrelate nearby keys
#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    next_epoch: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self { seed, next_epoch: 0 }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // Number of epochs handed out so far
    pub fn epochs_used(&self) -> u64 {
        self.next_epoch
    }

    // Open the stream family for one logical operation
    pub fn begin_epoch(&mut self) -> Epoch {
        let epoch = Epoch {
            seed: self.seed,
            epoch: self.next_epoch,
        };
        self.next_epoch += 1;
        epoch
    }
}

// Handle shared by all agents of one operation; Copy so rayon closures can capture it freely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    seed: u64,
    epoch: u64,
}

impl Epoch {
    pub fn index(&self) -> u64 {
        self.epoch
    }

    pub fn stream(&self, agent: usize) -> AgentRng {
        let key = splitmix64(self.seed ^ splitmix64(self.epoch));
        let key = splitmix64(key ^ splitmix64(agent as u64 ^ 0xA076_1D64_78BD_642F));
        AgentRng {
            rng: SmallRng::seed_from_u64(key),
        }
    }
}

pub struct AgentRng {
    rng: SmallRng,
}

impl AgentRng {
    // Uniform in [lo, hi); returns lo when the range is empty
    #[inline]
    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi > lo {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    // Uniform in [0, 1)
    #[inline]
    pub fn unit(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    // Uniform in [0, n); n must be non-zero
    #[inline]
    pub fn index_below(&mut self, n: u32) -> u32 {
        debug_assert!(n > 0, "index_below needs a non-empty range");
        self.rng.gen_range(0..n)
    }
}
