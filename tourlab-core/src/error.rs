//! Configuration errors.
//!
//! Everything here is raised while a race is being assembled, before the first
//! stage is simulated. A configuration that passes validation never makes the
//! engine fail.

use thiserror::Error;

/// Invalid rider, stage, tier or scoring configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("stage {stage}: discipline weights sum to {sum}, expected 1.0")]
    WeightsDoNotSumToOne { stage: u32, sum: f64 },

    #[error("stage {stage}: weight for {discipline} must be finite and non-negative, got {weight}")]
    InvalidWeight {
        stage: u32,
        discipline: String,
        weight: f64,
    },

    #[error("unknown discipline '{0}'")]
    UnknownDiscipline(String),

    #[error("unknown tier '{0}'")]
    UnknownTier(String),

    #[error("tier {tier}: expected finite 1 <= min <= mode <= max, got ({min}, {mode}, {max})")]
    InvalidTierParameters {
        tier: String,
        min: f64,
        mode: f64,
        max: f64,
    },

    #[error("duplicate rider name '{0}'")]
    DuplicateRider(String),

    #[error("rider '{rider}': {discipline} ability {value} is outside 0..=100")]
    AbilityOutOfRange {
        rider: String,
        discipline: String,
        value: u32,
    },

    #[error("rider '{rider}': abandon probability {value} is outside [0, 1]")]
    InvalidAbandonProbability { rider: String, value: f64 },

    #[error("rider '{rider}': price {value} must be finite and non-negative")]
    InvalidPrice { rider: String, value: f64 },

    #[error("rider list is empty")]
    NoRiders,

    #[error("stage table is empty")]
    NoStages,

    #[error("stage numbers must run 1..={expected_last} without gaps, found {found} at position {position}")]
    NonContiguousStages {
        position: usize,
        found: u32,
        expected_last: usize,
    },

    #[error("ordered roster: {0}")]
    InvalidRoster(String),

    #[error("unknown rider '{0}'")]
    UnknownRider(String),

    #[error("invalid point table '{table}': {reason}")]
    InvalidPointTable { table: String, reason: String },
}
