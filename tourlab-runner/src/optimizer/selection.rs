//! Optimizer output types.

use serde::{Deserialize, Serialize};
use std::fmt;

use tourlab_core::RiderId;

use super::{CandidatePool, OptimizerConfig};
use crate::sampler::TeamEvaluation;

/// Why the greedy heuristic produced the team instead of the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    Infeasible,
    SolverFailed { message: String },
    SolutionRejected { message: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Infeasible => write!(f, "solver reported the model infeasible"),
            FallbackReason::SolverFailed { message } => write!(f, "solver failed: {message}"),
            FallbackReason::SolutionRejected { message } => {
                write!(f, "solver solution rejected: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRider {
    pub rider: RiderId,
    pub name: String,
    pub team: String,
    pub price: f64,
    pub expected_points: f64,
    pub adjusted_points: f64,
    pub std: f64,
    pub abandon_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSelection {
    /// Ascending `RiderId` unless the selection is an ordered roster.
    pub riders: Vec<SelectedRider>,
    pub total_cost: f64,
    pub budget: f64,
    pub expected_points: f64,
    pub adjusted_points: f64,
    pub fallback: Option<FallbackReason>,
}

impl RosterSelection {
    pub(crate) fn build(
        pool: &CandidatePool<'_>,
        chosen: &[usize],
        config: &OptimizerConfig,
        fallback: Option<FallbackReason>,
    ) -> Self {
        let mut chosen = chosen.to_vec();
        chosen.sort_unstable();
        let riders: Vec<SelectedRider> = chosen
            .iter()
            .map(|&i| {
                let c = &pool.candidates[i];
                let rider = pool.registry.get(c.id);
                SelectedRider {
                    rider: c.id,
                    name: rider.name.clone(),
                    team: rider.team.clone(),
                    price: c.price,
                    expected_points: c.expected,
                    adjusted_points: c.adjusted,
                    std: c.std,
                    abandon_probability: c.abandon_probability,
                }
            })
            .collect();
        Self {
            total_cost: riders.iter().map(|r| r.price).sum(),
            budget: config.budget,
            expected_points: riders.iter().map(|r| r.expected_points).sum(),
            adjusted_points: riders.iter().map(|r| r.adjusted_points).sum(),
            riders,
            fallback,
        }
    }

    pub fn rider_ids(&self) -> Vec<RiderId> {
        self.riders.iter().map(|r| r.rider).collect()
    }

    pub fn contains(&self, rider: RiderId) -> bool {
        self.riders.iter().any(|r| r.rider == rider)
    }
}

/// One rider's attributed points in a stage lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSlot {
    pub rider: RiderId,
    pub name: String,
    pub expected_points: f64,
    pub adjusted_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLineup {
    /// Ledger stage number.
    pub stage: u32,
    pub riders: Vec<LineupSlot>,
    pub expected_points: f64,
    pub adjusted_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSelection {
    pub roster: RosterSelection,
    pub lineups: Vec<StageLineup>,
    /// Sum of fielded riders' expected stage points.
    pub expected_points: f64,
}

impl LineupSelection {
    pub(crate) fn build(
        pool: &CandidatePool<'_>,
        roster: RosterSelection,
        lineups: &[Vec<usize>],
    ) -> Self {
        let lineups: Vec<StageLineup> = lineups
            .iter()
            .enumerate()
            .map(|(k, fielded)| {
                let riders: Vec<LineupSlot> = fielded
                    .iter()
                    .map(|&i| {
                        let c = &pool.candidates[i];
                        LineupSlot {
                            rider: c.id,
                            name: pool.registry.name(c.id).to_string(),
                            expected_points: c.stage_expected[k],
                            adjusted_points: c.stage_adjusted[k],
                        }
                    })
                    .collect();
                StageLineup {
                    stage: pool.ledger_stages[k],
                    expected_points: riders.iter().map(|s| s.expected_points).sum(),
                    adjusted_points: riders.iter().map(|s| s.adjusted_points).sum(),
                    riders,
                }
            })
            .collect();
        Self {
            expected_points: lineups.iter().map(|l| l.expected_points).sum(),
            roster,
            lineups,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedRosterSelection {
    /// Riders in roster order.
    pub roster: RosterSelection,
    pub bonus_size: usize,
    pub scoring_size: usize,
    /// Mean top-10 finishes per rider, in roster order.
    pub expected_top10: Vec<f64>,
    pub evaluation: TeamEvaluation,
}

/// A chosen team: roster only, roster with stage lineups, or an ordered roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TeamSelection {
    RosterOnly(RosterSelection),
    WithLineup(LineupSelection),
    Ordered(OrderedRosterSelection),
}

impl TeamSelection {
    pub fn roster(&self) -> &RosterSelection {
        match self {
            TeamSelection::RosterOnly(r) => r,
            TeamSelection::WithLineup(l) => &l.roster,
            TeamSelection::Ordered(o) => &o.roster,
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.roster().fallback.is_some()
    }

    pub fn rider_ids(&self) -> Vec<RiderId> {
        self.roster().rider_ids()
    }
}
