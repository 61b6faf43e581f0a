//! Team analysis — validation, diagnostics, comparison and risk-profile sweeps.
//!
//! - `validate_team` / `check_roster`: the roster constraints on a user team
//! - `TeamDiagnostics`: cost efficiency, club spread, risk and age figures
//! - `compare_teams`: point/cost deltas and shared riders
//! - `risk_profile_sweep`: re-optimize across `(risk_aversion, abandon_penalty)`
//!   pairs to trace the points/risk trade-off

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

use tourlab_core::{RaceSetup, RiderId, RiderRegistry};

use crate::optimizer::{
    select_roster, CandidatePool, OptimizerConfig, RosterSelection, BUDGET_EPSILON,
};
use crate::sampler::SampleResult;

// ─── Validation ──────────────────────────────────────────────────────

/// First roster rule a team breaks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TeamViolation {
    #[error("team has {found} riders, expected {expected}")]
    WrongSize { expected: usize, found: usize },

    #[error("unknown rider '{0}'")]
    UnknownRider(String),

    #[error("rider '{0}' selected twice")]
    Duplicate(String),

    #[error("team costs {cost:.2}, over the budget of {budget:.2}")]
    OverBudget { cost: f64, budget: f64 },

    #[error("{count} riders from '{club}', at most {max} allowed")]
    ClubCap {
        club: String,
        count: usize,
        max: usize,
    },
}

/// Resolve rider names and check size, membership, duplicates, budget and
/// club cap, in that order.
pub fn validate_team<S: AsRef<str>>(
    registry: &RiderRegistry,
    names: &[S],
    config: &OptimizerConfig,
) -> Result<Vec<RiderId>, TeamViolation> {
    if names.len() != config.team_size {
        return Err(TeamViolation::WrongSize {
            expected: config.team_size,
            found: names.len(),
        });
    }
    let ids = names
        .iter()
        .map(|n| {
            registry
                .id_of(n.as_ref())
                .ok_or_else(|| TeamViolation::UnknownRider(n.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_roster(registry, &ids, config)?;
    Ok(ids)
}

/// The same checks on resolved ids.
pub fn check_roster(
    registry: &RiderRegistry,
    roster: &[RiderId],
    config: &OptimizerConfig,
) -> Result<(), TeamViolation> {
    if roster.len() != config.team_size {
        return Err(TeamViolation::WrongSize {
            expected: config.team_size,
            found: roster.len(),
        });
    }
    if let Some(unknown) = roster.iter().find(|r| r.0 >= registry.len()) {
        return Err(TeamViolation::UnknownRider(unknown.to_string()));
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = roster.iter().find(|r| !seen.insert(**r)) {
        return Err(TeamViolation::Duplicate(registry.name(*dup).to_string()));
    }
    let cost: f64 = roster.iter().map(|&r| registry.get(r).price).sum();
    if cost > config.budget + BUDGET_EPSILON {
        return Err(TeamViolation::OverBudget {
            cost,
            budget: config.budget,
        });
    }
    let mut per_club: BTreeMap<&str, usize> = BTreeMap::new();
    for &r in roster {
        *per_club.entry(registry.get(r).team.as_str()).or_insert(0) += 1;
    }
    if let Some((club, &count)) = per_club.iter().find(|&(_, &n)| n > config.max_per_club) {
        return Err(TeamViolation::ClubCap {
            club: club.to_string(),
            count,
            max: config.max_per_club,
        });
    }
    Ok(())
}

// ─── Diagnostics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderDiagnostics {
    pub rider: RiderId,
    pub name: String,
    pub team: String,
    pub price: f64,
    pub expected_points: f64,
    pub std: f64,
    /// `None` for a free rider.
    pub points_per_price: Option<f64>,
    pub abandon_probability: f64,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDiagnostics {
    pub riders: Vec<RiderDiagnostics>,
    pub total_cost: f64,
    pub budget: f64,
    /// `total_cost / budget`; 0 for a zero budget.
    pub budget_utilization: f64,
    pub expected_points: f64,
    /// Expected points per unit of price; 0 for a free team.
    pub cost_efficiency: f64,
    /// √Σσ² over the roster, riders treated as independent.
    pub combined_std: f64,
    pub club_distribution: BTreeMap<String, usize>,
    /// Clubs with two or more riders, where teammate bonuses can stack.
    pub teammate_clubs: Vec<String>,
    pub mean_abandon_probability: f64,
    /// Expected riders still in the race at the finish.
    pub expected_finishers: f64,
    pub mean_age: f64,
    pub youth_riders: usize,
}

impl TeamDiagnostics {
    pub fn analyze(
        setup: &RaceSetup,
        sample: &SampleResult,
        roster: &[RiderId],
        budget: f64,
    ) -> Result<Self, TeamViolation> {
        let registry = setup.registry();
        let youth_limit = setup.rules().youth_age_limit;

        let riders: Vec<RiderDiagnostics> = roster
            .iter()
            .map(|&id| -> Result<RiderDiagnostics, TeamViolation> {
                let rider = registry
                    .try_get(id)
                    .ok_or_else(|| TeamViolation::UnknownRider(id.to_string()))?;
                let stats = sample.rider(id);
                let expected = stats.map_or(0.0, |s| s.points.mean);
                Ok(RiderDiagnostics {
                    rider: id,
                    name: rider.name.clone(),
                    team: rider.team.clone(),
                    price: rider.price,
                    expected_points: expected,
                    std: stats.map_or(0.0, |s| s.points.std),
                    points_per_price: (rider.price > 0.0).then(|| expected / rider.price),
                    abandon_probability: rider.abandon_probability,
                    age: rider.age,
                })
            })
            .collect::<Result<_, _>>()?;

        let total_cost: f64 = riders.iter().map(|r| r.price).sum();
        let expected_points: f64 = riders.iter().map(|r| r.expected_points).sum();
        let mut club_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for r in &riders {
            *club_distribution.entry(r.team.clone()).or_insert(0) += 1;
        }
        let teammate_clubs: Vec<String> = club_distribution
            .iter()
            .filter(|&(_, &n)| n >= 2)
            .map(|(club, _)| club.clone())
            .collect();
        let n = riders.len().max(1) as f64;

        Ok(Self {
            total_cost,
            budget,
            budget_utilization: if budget > 0.0 { total_cost / budget } else { 0.0 },
            expected_points,
            cost_efficiency: if total_cost > 0.0 {
                expected_points / total_cost
            } else {
                0.0
            },
            combined_std: riders.iter().map(|r| r.std * r.std).sum::<f64>().sqrt(),
            club_distribution,
            teammate_clubs,
            mean_abandon_probability: riders.iter().map(|r| r.abandon_probability).sum::<f64>()
                / n,
            expected_finishers: roster
                .iter()
                .map(|&id| 1.0 - sample.rider(id).map_or(0.0, |s| s.abandon_rate))
                .sum(),
            mean_age: riders.iter().map(|r| r.age as f64).sum::<f64>() / n,
            youth_riders: riders.iter().filter(|r| r.age < youth_limit).count(),
            riders,
        })
    }
}

// ─── Comparison ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamComparison {
    /// `second − first`.
    pub points_delta: f64,
    pub cost_delta: f64,
    pub std_delta: f64,
    pub shared: Vec<String>,
    pub only_first: Vec<String>,
    pub only_second: Vec<String>,
}

pub fn compare_teams(first: &TeamDiagnostics, second: &TeamDiagnostics) -> TeamComparison {
    let a: BTreeSet<&str> = first.riders.iter().map(|r| r.name.as_str()).collect();
    let b: BTreeSet<&str> = second.riders.iter().map(|r| r.name.as_str()).collect();
    let owned = |set: BTreeSet<&&str>| -> Vec<String> {
        set.into_iter().map(|s| s.to_string()).collect()
    };
    TeamComparison {
        points_delta: second.expected_points - first.expected_points,
        cost_delta: second.total_cost - first.total_cost,
        std_delta: second.combined_std - first.combined_std,
        shared: owned(a.intersection(&b).collect()),
        only_first: owned(a.difference(&b).collect()),
        only_second: owned(b.difference(&a).collect()),
    }
}

// ─── Risk-profile sweep ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub risk_aversion: f64,
    pub abandon_penalty: f64,
}

impl RiskProfile {
    pub const fn new(risk_aversion: f64, abandon_penalty: f64) -> Self {
        Self {
            risk_aversion,
            abandon_penalty,
        }
    }

    /// From risk-neutral to strongly risk-averse, plus a lighter abandonment penalty.
    pub fn defaults() -> Vec<RiskProfile> {
        vec![
            Self::new(0.0, 1.0),
            Self::new(0.2, 1.0),
            Self::new(0.5, 1.0),
            Self::new(0.8, 1.0),
            Self::new(0.0, 0.5),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub profile: RiskProfile,
    pub selection: RosterSelection,
    /// √Σσ² of the selected riders.
    pub combined_std: f64,
}

/// One roster per profile. Profiles that fail to produce a team are logged
/// and skipped.
pub fn risk_profile_sweep(
    registry: &RiderRegistry,
    sample: &SampleResult,
    base: &OptimizerConfig,
    profiles: &[RiskProfile],
) -> Vec<SweepEntry> {
    let mut entries = Vec::with_capacity(profiles.len());
    for &profile in profiles {
        let config = OptimizerConfig {
            risk_aversion: profile.risk_aversion,
            abandon_penalty: profile.abandon_penalty,
            ..base.clone()
        };
        let outcome = config
            .validate()
            .and_then(|()| CandidatePool::build(registry, sample, &config))
            .and_then(|pool| select_roster(&pool, &config));
        match outcome {
            Ok(selection) => {
                let combined_std = selection
                    .riders
                    .iter()
                    .map(|r| r.std * r.std)
                    .sum::<f64>()
                    .sqrt();
                info!(
                    risk_aversion = profile.risk_aversion,
                    abandon_penalty = profile.abandon_penalty,
                    expected = selection.expected_points,
                    "profile optimized"
                );
                entries.push(SweepEntry {
                    profile,
                    selection,
                    combined_std,
                });
            }
            Err(e) => warn!(
                risk_aversion = profile.risk_aversion,
                abandon_penalty = profile.abandon_penalty,
                error = %e,
                "skipping risk profile"
            ),
        }
    }
    entries
}
