/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that carries every
 * setting of a run: population size, seed, domain bounds, grid resolution,
 * flocking rule weights, speed limit and boundary containment. Nothing is
 * read from global state; the driver builds one of these (from defaults or
 * a JSON file) and hands it to the simulation.
 */

use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{GRID_RESOLUTION, WORLD_SIZE};

// Axis-aligned rectangle the agents live in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            xmin: 0.0,
            xmax: WORLD_SIZE,
            ymin: 0.0,
            ymax: WORLD_SIZE,
        }
    }
}

impl Domain {
    pub fn new(xmin: f32, xmax: f32, ymin: f32, ymax: f32) -> Self {
        Self { xmin, xmax, ymin, ymax }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    // Target of the centering rule
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (0.5 * (self.xmin + self.xmax), 0.5 * (self.ymin + self.ymax))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [self.xmin, self.xmax, self.ymin, self.ymax];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("domain bounds must be finite"));
        }
        if self.xmax <= self.xmin {
            return Err(ConfigError::Invalid("domain xmax must be greater than xmin"));
        }
        if self.ymax <= self.ymin {
            return Err(ConfigError::Invalid("domain ymax must be greater than ymin"));
        }
        Ok(())
    }
}

// Parameters for the simulation, all explicit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub num_boids: usize,
    pub num_iterations: u64,
    pub seed: u64,
    pub domain: Domain,
    // Grid resolution along each axis
    pub nbox_x: usize,
    pub nbox_y: usize,
    // Flocking rule weights
    pub centering_factor: f32,
    pub matching_factor: f32,
    pub avoid_factor: f32,
    pub alignment_factor: f32,
    pub speed_limit: f32,
    // Boundary containment
    pub margin: f32,
    pub turn_factor: f32,
    // Per-axis bound of the random initial velocity
    pub initial_speed: f32,
    // Adversary refresh cadence (in steps, 0 disables) and fraction of agents reassigned
    pub refresh_interval: u64,
    pub refresh_rate: f32,
    // Performance and diagnostics
    pub enable_parallel: bool,
    pub collect_stats: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_boids: 10_000,
            num_iterations: 100,
            seed: 42,
            domain: Domain::default(),
            nbox_x: GRID_RESOLUTION,
            nbox_y: GRID_RESOLUTION,
            centering_factor: 0.01,
            matching_factor: 0.05,
            avoid_factor: 0.03,
            alignment_factor: 0.0,
            speed_limit: 2.0,
            margin: 0.1 * WORLD_SIZE,
            turn_factor: 1.0,
            initial_speed: 1.0,
            refresh_interval: 200,
            refresh_rate: 0.1,
            enable_parallel: true,
            collect_stats: false,
        }
    }
}

impl SimulationParams {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.nbox_x * self.nbox_y
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.domain.validate()?;

        if !Self::get_num_boids_range().contains(&self.num_boids) {
            return Err(ConfigError::Invalid("num_boids must fit in a u32 agent index"));
        }
        let resolution = Self::get_grid_resolution_range();
        if !resolution.contains(&self.nbox_x) || !resolution.contains(&self.nbox_y) {
            return Err(ConfigError::Invalid("grid resolution must be between 1 and 4096 per axis"));
        }

        let factors = [
            self.centering_factor,
            self.matching_factor,
            self.avoid_factor,
            self.alignment_factor,
        ];
        if factors.iter().any(|f| !f.is_finite()) {
            return Err(ConfigError::Invalid("rule factors must be finite"));
        }
        if !self.speed_limit.is_finite() || self.speed_limit <= 0.0 {
            return Err(ConfigError::Invalid("speed_limit must be positive"));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::Invalid("margin must be non-negative"));
        }
        if !self.turn_factor.is_finite() || self.turn_factor < 0.0 {
            return Err(ConfigError::Invalid("turn_factor must be non-negative"));
        }
        if !self.initial_speed.is_finite() || self.initial_speed < 0.0 {
            return Err(ConfigError::Invalid("initial_speed must be non-negative"));
        }
        if !Self::get_rate_range().contains(&self.refresh_rate) {
            return Err(ConfigError::Invalid("refresh_rate must be between 0 and 1"));
        }
        Ok(())
    }

    // Accepted parameter ranges
    pub fn get_num_boids_range() -> RangeInclusive<usize> {
        0..=u32::MAX as usize
    }

    pub fn get_grid_resolution_range() -> RangeInclusive<usize> {
        1..=4096
    }

    pub fn get_rate_range() -> RangeInclusive<f32> {
        0.0..=1.0
    }
}
