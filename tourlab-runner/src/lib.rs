//! TourLab Runner — Monte Carlo sampling, roster optimization, team analysis.
//!
//! This crate builds on `tourlab-core` to provide:
//! - Expected-value sampler (parallel, seed-deterministic)
//! - Summary statistics over simulated totals
//! - Roster optimizer: single-layer and two-layer MILP with greedy fallback
//! - Lineup planning for fixed rosters and ordered-roster selection
//! - Team validation, diagnostics, comparison and risk-profile sweeps
//! - TOML race files

pub mod analysis;
pub mod config;
pub mod optimizer;
pub mod sampler;
pub mod stats;

pub use analysis::{
    check_roster, compare_teams, risk_profile_sweep, validate_team, RiskProfile, SweepEntry,
    TeamComparison, TeamDiagnostics, TeamViolation,
};
pub use config::{RaceFile, RaceFileError};
pub use optimizer::lineup::plan_lineups;
pub use optimizer::ordered::{optimize_ordered_roster, OrderedSettings};
pub use optimizer::{
    optimize_roster, optimize_with_lineups, FallbackReason, OptimizerConfig, OptimizerError,
    PointsMetric, RosterSelection, TeamSelection,
};
pub use sampler::{
    ExpectedValueSampler, RiderStats, SampleResult, SamplerConfig, SamplerError,
    SamplerProgress, TeamEvaluation,
};
pub use stats::Summary;
