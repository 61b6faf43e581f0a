//! TourLab Core — riders, stage profiles, ability model, tour simulation and
//! fantasy scoring.
//!
//! This crate contains the race engine:
//! - Domain types (disciplines, riders, clubs, stage profiles)
//! - Tier table and ability-to-outcome model (blended triangular distributions)
//! - Stage-by-stage simulator with abandonment and four classifications
//! - Pluggable scoring policies (standard, ordered roster)
//! - Per-run seeds and race fingerprinting

pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod race;
pub mod rng;
pub mod rules;
pub mod scoring;
pub mod tiers;

pub use domain::{
    Abilities, ClubIndex, Discipline, Rider, RiderId, RiderRegistry, SprintCategory,
    StageProfile, StageTable,
};
pub use engine::{SimulationState, Standings, TourResult, TourSimulator};
pub use error::ConfigError;
pub use fingerprint::RaceFingerprint;
pub use race::RaceSetup;
pub use rng::RunSeeds;
pub use rules::ClassificationRules;
pub use scoring::{
    OrderedRosterPolicy, OrderedTables, ScoreStage, ScoringPolicy, StandardPolicy, StandardTables,
};
pub use tiers::{AbilityModel, RankDistribution, Tier, TierTable};
