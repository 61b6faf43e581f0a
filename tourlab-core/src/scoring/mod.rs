//! Fantasy scoring policies.
//!
//! - `StandardPolicy`: finish points, leadership snapshots, teammate bonuses
//!   and end-of-race awards on an extra ledger stage.
//! - `OrderedRosterPolicy`: an ordered roster whose first positions score,
//!   with reserves promoted as scorers abandon.
//!
//! Both implement [`ScoreStage`]; [`ScoringPolicy`] selects one at
//! configuration time.

pub mod ordered_roster;
pub mod standard;

pub use ordered_roster::{OrderedRosterPolicy, OrderedTables, Promotion, RosterState};
pub use standard::{ClassificationBonus, StandardPolicy, StandardTables};

use serde::Serialize;

use crate::domain::{ClubIndex, RiderId, StageProfile};
use crate::error::ConfigError;
use crate::engine::classification::Standings;
use crate::engine::stage::Placing;
use crate::engine::state::SimulationState;

/// What a policy sees after a racing stage.
pub struct StageContext<'a> {
    pub profile: &'a StageProfile,
    pub placings: &'a [Placing],
    pub standings: &'a Standings,
    pub clubs: &'a ClubIndex,
}

/// What a policy sees after the last racing stage.
pub struct FinalContext<'a> {
    pub standings: &'a Standings,
    pub clubs: &'a ClubIndex,
}

/// Per-stage scoring capability shared by every policy.
pub trait ScoreStage {
    /// Set up per-run policy state.
    fn prepare(&self, _state: &mut SimulationState) {}

    /// Add this stage's points to the ledger.
    fn score_stage(&self, ctx: &StageContext<'_>, state: &mut SimulationState);

    /// Whether the policy awards end-of-race points on an extra ledger stage.
    fn has_final_awards(&self) -> bool {
        false
    }

    fn final_awards(&self, _ctx: &FinalContext<'_>, _state: &mut SimulationState) {}
}

/// Scoring policy chosen for a race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringPolicy {
    Standard(StandardPolicy),
    OrderedRoster(OrderedRosterPolicy),
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy::Standard(StandardPolicy::default())
    }
}

impl ScoringPolicy {
    /// Reject point tables the ledger cannot score from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ScoringPolicy::Standard(p) => p.tables.validate(),
            ScoringPolicy::OrderedRoster(p) => p.tables().validate(p.bonus_size()),
        }
    }
}

impl ScoreStage for ScoringPolicy {
    fn prepare(&self, state: &mut SimulationState) {
        match self {
            ScoringPolicy::Standard(p) => p.prepare(state),
            ScoringPolicy::OrderedRoster(p) => p.prepare(state),
        }
    }

    fn score_stage(&self, ctx: &StageContext<'_>, state: &mut SimulationState) {
        match self {
            ScoringPolicy::Standard(p) => p.score_stage(ctx, state),
            ScoringPolicy::OrderedRoster(p) => p.score_stage(ctx, state),
        }
    }

    fn has_final_awards(&self) -> bool {
        match self {
            ScoringPolicy::Standard(p) => p.has_final_awards(),
            ScoringPolicy::OrderedRoster(p) => p.has_final_awards(),
        }
    }

    fn final_awards(&self, ctx: &FinalContext<'_>, state: &mut SimulationState) {
        match self {
            ScoringPolicy::Standard(p) => p.final_awards(ctx, state),
            ScoringPolicy::OrderedRoster(p) => p.final_awards(ctx, state),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Points at 0-based `place`, zero past the end of the table.
pub(crate) fn table_points(table: &[u32], place: usize) -> u32 {
    table.get(place).copied().unwrap_or(0)
}

pub(crate) fn invalid_table(table: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPointTable {
        table: table.to_string(),
        reason: reason.into(),
    }
}

/// Points never increase with a worse place.
pub(crate) fn check_non_increasing(name: &str, table: &[u32]) -> Result<(), ConfigError> {
    match table.windows(2).position(|w| w[1] > w[0]) {
        Some(i) => Err(invalid_table(
            name,
            format!("place {} pays more than place {}", i + 2, i + 1),
        )),
        None => Ok(()),
    }
}

/// Non-empty and non-increasing.
pub(crate) fn check_table(name: &str, table: &[u32]) -> Result<(), ConfigError> {
    if table.is_empty() {
        return Err(invalid_table(name, "table is empty"));
    }
    check_non_increasing(name, table)
}

/// Flat bonus for every active teammate of `leader`, the leader excluded.
pub(crate) fn award_teammates(
    state: &mut SimulationState,
    clubs: &ClubIndex,
    leader: RiderId,
    points: u32,
) {
    if points == 0 {
        return;
    }
    for &mate in clubs.teammates(leader) {
        if mate != leader && state.is_active(mate) {
            state.award(mate, points);
        }
    }
}
