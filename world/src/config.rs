//! Tunable parameters for constructing a world.

use beatgrid_core::BeatPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BPM: f64 = 120.0;
const DEFAULT_SEED: u64 = 0x5eed_b3a7_0c1d_2e4f;

/// Parameters fixed for the lifetime of a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Tempo of the beat clock in beats per minute.
    pub bpm: f64,
    /// Whether one tick may fire several beats.
    pub beat_policy: BeatPolicy,
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// World-space position of cell `(0, 0)`.
    pub origin: [f32; 2],
    /// Seed of the generator enemies use to pick directions.
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            beat_policy: BeatPolicy::CatchUp,
            cell_size: 1.0,
            origin: [0.0, 0.0],
            seed: DEFAULT_SEED,
        }
    }
}

impl WorldConfig {
    /// Checks the parameters the world would otherwise clamp silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(ConfigError::InvalidTempo(self.bpm));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        Ok(())
    }
}

/// Errors reported by [`WorldConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The tempo cannot produce a beat interval.
    #[error("tempo must be a positive, finite number of beats per minute (got {0})")]
    InvalidTempo(f64),
    /// The cell size cannot map cells to world space.
    #[error("cell size must be a positive, finite length (got {0})")]
    InvalidCellSize(f32),
}
