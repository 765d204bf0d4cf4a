/*
 * Error Module
 *
 * The stepping core never fails: numeric edge cases are clamped in place.
 * Only building a simulation from configuration can go wrong, and those
 * failures are reported through ConfigError.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    // A parameter value the simulation cannot run with
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
