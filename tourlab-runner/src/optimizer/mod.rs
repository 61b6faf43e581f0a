//! Roster optimizer — picks a fantasy team from sampled expected points.
//!
//! Two formulations over binary decision variables:
//! - `optimize_roster`: roster only (size, budget, per-club cap)
//! - `optimize_with_lineups`: roster plus the active lineup of every ledger stage
//!
//! Both solve a MILP through `good_lp`. When the solver reports infeasibility,
//! fails, or returns a team that breaks a constraint, a deterministic greedy
//! takes over and the selection records why. The optimizer never returns a
//! team that violates size, budget or club constraints.

pub mod greedy;
pub mod ilp;
pub mod lineup;
pub mod ordered;
pub mod selection;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use tourlab_core::{ClubIndex, ConfigError, RiderId, RiderRegistry};

use crate::analysis::TeamViolation;
use crate::sampler::{SampleResult, SamplerError};
use ilp::IlpOutcome;
pub use selection::{
    FallbackReason, LineupSelection, LineupSlot, OrderedRosterSelection, RosterSelection,
    SelectedRider, StageLineup, TeamSelection,
};

/// Slack allowed when comparing summed prices against the budget.
pub(crate) const BUDGET_EPSILON: f64 = 1e-6;

// ─── Configuration ───────────────────────────────────────────────────

/// Which statistic of the sampled totals counts as a rider's expected points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsMetric {
    #[default]
    Mean,
    Median,
    Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub budget: f64,
    pub team_size: usize,
    /// Riders fielded on an ordinary ledger stage.
    pub lineup_size_regular: usize,
    /// Riders fielded on the last ledger stage.
    pub lineup_size_final: usize,
    pub max_per_club: usize,
    /// Weight of the total-points standard deviation, in `[0, 1]`.
    pub risk_aversion: f64,
    /// Weight of the abandonment probability, in `[0, 1]`.
    pub abandon_penalty: f64,
    pub metric: PointsMetric,
    /// Club name → minimum riders from that club.
    pub min_per_club: BTreeMap<String, usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            budget: 48.0,
            team_size: 20,
            lineup_size_regular: 9,
            lineup_size_final: 20,
            max_per_club: 4,
            risk_aversion: 0.0,
            abandon_penalty: 0.0,
            metric: PointsMetric::Mean,
            min_per_club: BTreeMap::new(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let invalid = |msg: String| Err(OptimizerError::InvalidConfig(msg));
        if !self.budget.is_finite() || self.budget < 0.0 {
            return invalid(format!("budget must be a non-negative number, got {}", self.budget));
        }
        if self.team_size == 0 {
            return invalid("team_size must be at least 1".into());
        }
        if self.max_per_club == 0 {
            return invalid("max_per_club must be at least 1".into());
        }
        for (name, size) in [
            ("lineup_size_regular", self.lineup_size_regular),
            ("lineup_size_final", self.lineup_size_final),
        ] {
            if size > self.team_size {
                return invalid(format!(
                    "{name} ({size}) exceeds team_size ({})",
                    self.team_size
                ));
            }
        }
        for (name, knob) in [
            ("risk_aversion", self.risk_aversion),
            ("abandon_penalty", self.abandon_penalty),
        ] {
            if !(0.0..=1.0).contains(&knob) {
                return invalid(format!("{name} must lie in [0, 1], got {knob}"));
            }
        }
        for (club, &min) in &self.min_per_club {
            if min > self.max_per_club {
                return invalid(format!(
                    "minimum {min} for '{club}' exceeds max_per_club ({})",
                    self.max_per_club
                ));
            }
        }
        let required: usize = self.min_per_club.values().sum();
        if required > self.team_size {
            return invalid(format!(
                "club minimums require {required} riders, team_size is {}",
                self.team_size
            ));
        }
        Ok(())
    }

    /// Required lineup size for ledger stage `index` of `count`.
    pub fn lineup_size(&self, index: usize, count: usize) -> usize {
        if index + 1 == count {
            self.lineup_size_final
        } else {
            self.lineup_size_regular
        }
    }
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invalid optimizer configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "no team of {team_size} riders fits budget {budget} with at most {max_per_club} per club"
    )]
    NoFeasibleTeam {
        team_size: usize,
        budget: f64,
        max_per_club: usize,
    },

    #[error("sample was taken without per-stage statistics")]
    MissingStageStats,

    #[error(transparent)]
    InvalidTeam(#[from] TeamViolation),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ─── Candidate pool ──────────────────────────────────────────────────

/// One rider as the optimizer sees it. Indexed by `RiderId`.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: RiderId,
    pub club: usize,
    pub price: f64,
    pub expected: f64,
    pub std: f64,
    pub adjusted: f64,
    pub abandon_probability: f64,
    pub stage_expected: Vec<f64>,
    pub stage_adjusted: Vec<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct CandidatePool<'a> {
    pub registry: &'a RiderRegistry,
    pub clubs: ClubIndex,
    pub candidates: Vec<Candidate>,
    pub ledger_stages: Vec<u32>,
    /// Club index → minimum riders.
    pub club_minimums: Vec<(usize, usize)>,
}

impl<'a> CandidatePool<'a> {
    /// Risk- and abandonment-adjusted values for every registered rider.
    /// Riders without sampled data count as zero expected points.
    pub fn build(
        registry: &'a RiderRegistry,
        sample: &SampleResult,
        config: &OptimizerConfig,
    ) -> Result<Self, OptimizerError> {
        let clubs = ClubIndex::new(registry);
        let club_minimums = config
            .min_per_club
            .iter()
            .filter(|&(_, &min)| min > 0)
            .map(|(name, &min)| {
                clubs
                    .index_of(name)
                    .map(|club| (club, min))
                    .ok_or_else(|| OptimizerError::InvalidConfig(format!("unknown club '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stage_count = sample.ledger_stages.len();
        let candidates = registry
            .iter()
            .map(|(id, rider)| {
                let stats = sample.rider(id);
                let expected = stats.map_or(0.0, |s| match config.metric {
                    PointsMetric::Mean => s.points.mean,
                    PointsMetric::Median => s.points.median,
                    PointsMetric::Mode => s.points.mode,
                });
                let std = stats.map_or(0.0, |s| s.points.std);
                let survival = 1.0 - config.abandon_penalty * rider.abandon_probability;
                let adjust = |points: f64| (points - config.risk_aversion * std) * survival;
                let stage_expected: Vec<f64> = (0..stage_count)
                    .map(|k| {
                        stats
                            .and_then(|s| s.stages.get(k))
                            .map_or(0.0, |st| st.mean)
                    })
                    .collect();
                Candidate {
                    id,
                    club: clubs.club_of(id),
                    price: rider.price,
                    expected,
                    std,
                    adjusted: adjust(expected),
                    abandon_probability: rider.abandon_probability,
                    stage_adjusted: stage_expected.iter().map(|&p| adjust(p)).collect(),
                    stage_expected,
                }
            })
            .collect();

        Ok(Self {
            registry,
            clubs,
            candidates,
            ledger_stages: sample.ledger_stages.clone(),
            club_minimums,
        })
    }

    pub fn has_stage_stats(&self, sample: &SampleResult) -> bool {
        sample.num_simulations == 0
            || self.ledger_stages.is_empty()
            || sample.riders.iter().all(|r| r.stages.len() == self.ledger_stages.len())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check every roster constraint on `chosen` (candidate indices).
    pub fn verify(&self, chosen: &[usize], config: &OptimizerConfig) -> Result<(), String> {
        if chosen.len() != config.team_size {
            return Err(format!(
                "{} riders selected, expected {}",
                chosen.len(),
                config.team_size
            ));
        }
        let mut seen = vec![false; self.len()];
        let mut per_club = vec![0usize; self.clubs.len()];
        let mut cost = 0.0;
        for &i in chosen {
            if std::mem::replace(&mut seen[i], true) {
                return Err(format!("rider {} selected twice", self.candidates[i].id));
            }
            per_club[self.candidates[i].club] += 1;
            cost += self.candidates[i].price;
        }
        if cost > config.budget + BUDGET_EPSILON {
            return Err(format!("cost {cost:.3} exceeds budget {:.3}", config.budget));
        }
        if let Some(club) = per_club.iter().position(|&n| n > config.max_per_club) {
            return Err(format!(
                "{} riders from '{}'",
                per_club[club],
                self.clubs.name(club)
            ));
        }
        if let Some(&(club, min)) = self
            .club_minimums
            .iter()
            .find(|(club, min)| per_club[*club] < *min)
        {
            return Err(format!(
                "{} riders from '{}', at least {min} required",
                per_club[club],
                self.clubs.name(club)
            ));
        }
        Ok(())
    }

    /// Check that every lineup fields the required number of roster riders.
    pub fn verify_lineups(
        &self,
        chosen: &[usize],
        lineups: &[Vec<usize>],
        config: &OptimizerConfig,
    ) -> Result<(), String> {
        if lineups.len() != self.ledger_stages.len() {
            return Err(format!(
                "{} lineups for {} stages",
                lineups.len(),
                self.ledger_stages.len()
            ));
        }
        for (k, lineup) in lineups.iter().enumerate() {
            let required = config.lineup_size(k, lineups.len());
            if lineup.len() != required {
                return Err(format!(
                    "stage {} fields {} riders, expected {required}",
                    self.ledger_stages[k],
                    lineup.len()
                ));
            }
            if let Some(&i) = lineup.iter().find(|i| !chosen.contains(i)) {
                return Err(format!(
                    "stage {} fields {} who is not on the roster",
                    self.ledger_stages[k], self.candidates[i].id
                ));
            }
        }
        Ok(())
    }

    /// Best `config.lineup_size(k)` roster riders per ledger stage by
    /// adjusted stage points; ties go to the lower id.
    pub fn best_lineups(&self, chosen: &[usize], config: &OptimizerConfig) -> Vec<Vec<usize>> {
        let count = self.ledger_stages.len();
        (0..count)
            .map(|k| {
                let mut order = chosen.to_vec();
                order.sort_by(|&a, &b| {
                    self.candidates[b].stage_adjusted[k]
                        .total_cmp(&self.candidates[a].stage_adjusted[k])
                        .then(a.cmp(&b))
                });
                order.truncate(config.lineup_size(k, count));
                order.sort_unstable();
                order
            })
            .collect()
    }
}

// ─── Entry points ────────────────────────────────────────────────────

/// Single-layer fast path: the roster that maximizes adjusted total points.
pub fn optimize_roster(
    registry: &RiderRegistry,
    sample: &SampleResult,
    config: &OptimizerConfig,
) -> Result<TeamSelection, OptimizerError> {
    config.validate()?;
    let pool = CandidatePool::build(registry, sample, config)?;
    select_roster(&pool, config).map(TeamSelection::RosterOnly)
}

/// Roster plus per-stage lineups, solved jointly.
pub fn optimize_with_lineups(
    registry: &RiderRegistry,
    sample: &SampleResult,
    config: &OptimizerConfig,
) -> Result<TeamSelection, OptimizerError> {
    config.validate()?;
    let pool = CandidatePool::build(registry, sample, config)?;
    if !pool.has_stage_stats(sample) {
        return Err(OptimizerError::MissingStageStats);
    }
    info!(
        riders = pool.len(),
        stages = pool.ledger_stages.len(),
        "solving roster and lineups"
    );

    let solved = match ilp::solve_with_lineups(&pool, config) {
        IlpOutcome::Solved(solution) => {
            match pool
                .verify(&solution.selected, config)
                .and_then(|()| pool.verify_lineups(&solution.selected, &solution.lineups, config))
            {
                Ok(()) => Ok((solution.selected, solution.lineups)),
                Err(message) => Err(FallbackReason::SolutionRejected { message }),
            }
        }
        IlpOutcome::Infeasible => Err(FallbackReason::Infeasible),
        IlpOutcome::Failed(message) => Err(FallbackReason::SolverFailed { message }),
    };

    let (selected, lineups, fallback) = match solved {
        Ok((selected, lineups)) => (selected, lineups, None),
        Err(reason) => {
            let selected = run_greedy(&pool, config, &reason)?;
            let lineups = pool.best_lineups(&selected, config);
            (selected, lineups, Some(reason))
        }
    };

    let roster = RosterSelection::build(&pool, &selected, config, fallback);
    Ok(TeamSelection::WithLineup(LineupSelection::build(
        &pool, roster, &lineups,
    )))
}

/// Shared roster step: MILP, verification, greedy fallback.
pub(crate) fn select_roster(
    pool: &CandidatePool<'_>,
    config: &OptimizerConfig,
) -> Result<RosterSelection, OptimizerError> {
    info!(
        riders = pool.len(),
        budget = config.budget,
        team_size = config.team_size,
        "solving roster"
    );
    let solved = match ilp::solve_roster(pool, config) {
        IlpOutcome::Solved(solution) => match pool.verify(&solution.selected, config) {
            Ok(()) => Ok(solution.selected),
            Err(message) => Err(FallbackReason::SolutionRejected { message }),
        },
        IlpOutcome::Infeasible => Err(FallbackReason::Infeasible),
        IlpOutcome::Failed(message) => Err(FallbackReason::SolverFailed { message }),
    };
    let (selected, fallback) = match solved {
        Ok(selected) => (selected, None),
        Err(reason) => (run_greedy(pool, config, &reason)?, Some(reason)),
    };
    Ok(RosterSelection::build(pool, &selected, config, fallback))
}

fn run_greedy(
    pool: &CandidatePool<'_>,
    config: &OptimizerConfig,
    reason: &FallbackReason,
) -> Result<Vec<usize>, OptimizerError> {
    warn!(%reason, "falling back to greedy roster selection");
    greedy::select(pool, config)
        .filter(|chosen| pool.verify(chosen, config).is_ok())
        .ok_or(OptimizerError::NoFeasibleTeam {
            team_size: config.team_size,
            budget: config.budget,
            max_per_club: config.max_per_club,
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sampler::{RiderStats, StageStats};
    use crate::stats::Summary;
    use tourlab_core::{Abilities, Rider};

    /// `(name, team, price, expected, abandon_probability)`
    pub fn make_registry(riders: &[(&str, &str, f64, f64, f64)]) -> RiderRegistry {
        RiderRegistry::new(
            riders
                .iter()
                .map(|&(name, team, price, _, p)| Rider {
                    name: name.into(),
                    team: team.into(),
                    age: 26,
                    price,
                    abandon_probability: p,
                    abilities: Abilities::uniform(50),
                })
                .collect(),
        )
        .unwrap()
    }

    /// Synthetic sample: two ledger stages, points split 3:1, std = expected / 4.
    pub fn make_sample(riders: &[(&str, &str, f64, f64, f64)]) -> SampleResult {
        SampleResult {
            num_simulations: 100,
            master_seed: 0,
            fingerprint: String::new(),
            ledger_stages: vec![1, 2],
            riders: riders
                .iter()
                .enumerate()
                .map(|(i, &(name, team, price, expected, p))| RiderStats {
                    rider: RiderId(i),
                    name: name.into(),
                    team: team.into(),
                    price,
                    abandon_probability: p,
                    points: Summary {
                        mean: expected,
                        median: expected,
                        mode: expected,
                        std: expected / 4.0,
                        min: 0.0,
                        max: 2.0 * expected,
                    },
                    abandon_rate: p,
                    mean_top10: expected / 10.0,
                    stages: vec![
                        StageStats {
                            stage: 1,
                            mean: 0.75 * expected,
                            std: 0.0,
                        },
                        StageStats {
                            stage: 2,
                            mean: 0.25 * expected,
                            std: 0.0,
                        },
                    ],
                })
                .collect(),
        }
    }
}
