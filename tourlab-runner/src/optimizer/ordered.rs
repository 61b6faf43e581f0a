//! Ordered-roster mode.
//!
//! 1. Sample the field under an open ordered policy: every rider earns
//!    finish-position points, no roster bonus.
//! 2. Pick the roster with the single-layer program.
//! 3. Order it by expected top-10 finishes (then expected points, then id) so
//!    the likeliest top-10 riders hold the bonus positions.
//! 4. Evaluate the ordered roster under the real ordered policy, reserves and
//!    promotions included.

use serde::{Deserialize, Serialize};
use tracing::info;

use tourlab_core::{OrderedRosterPolicy, OrderedTables, RaceSetup, RiderId, ScoringPolicy};

use super::{
    select_roster, CandidatePool, OptimizerConfig, OptimizerError, OrderedRosterSelection,
    TeamSelection,
};
use crate::sampler::{ExpectedValueSampler, SamplerConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedSettings {
    pub bonus_size: usize,
    pub scoring_size: usize,
    pub tables: OrderedTables,
    /// Simulations used to evaluate the final ordered roster.
    pub evaluation_runs: usize,
}

impl Default for OrderedSettings {
    fn default() -> Self {
        Self {
            bonus_size: OrderedRosterPolicy::DEFAULT_BONUS_SIZE,
            scoring_size: OrderedRosterPolicy::DEFAULT_SCORING_SIZE,
            tables: OrderedTables::default(),
            evaluation_runs: 200,
        }
    }
}

pub fn optimize_ordered_roster(
    setup: &RaceSetup,
    sampler_config: &SamplerConfig,
    config: &OptimizerConfig,
    settings: &OrderedSettings,
) -> Result<TeamSelection, OptimizerError> {
    config.validate()?;

    let open_field = setup.clone().with_policy(ScoringPolicy::OrderedRoster(
        OrderedRosterPolicy::open_field(settings.tables.clone()),
    ))?;
    let sample = ExpectedValueSampler::new(open_field).sample(sampler_config, None)?;

    let pool = CandidatePool::build(setup.registry(), &sample, config)?;
    let mut roster = select_roster(&pool, config)?;

    let top10 = |id: RiderId| sample.rider(id).map_or(0.0, |s| s.mean_top10);
    roster.riders.sort_by(|a, b| {
        top10(b.rider)
            .total_cmp(&top10(a.rider))
            .then(b.expected_points.total_cmp(&a.expected_points))
            .then(a.rider.cmp(&b.rider))
    });
    let order = roster.rider_ids();

    let policy = OrderedRosterPolicy::new(
        order.clone(),
        settings.bonus_size,
        settings.scoring_size,
        settings.tables.clone(),
    )?;
    let evaluator =
        ExpectedValueSampler::new(setup.clone().with_policy(ScoringPolicy::OrderedRoster(policy))?);
    let evaluation_config = SamplerConfig {
        num_simulations: settings.evaluation_runs,
        ..sampler_config.clone()
    };
    let evaluation = evaluator.evaluate_team(&evaluation_config, &order)?;
    info!(
        expected = evaluation.points.mean,
        promotions = evaluation.mean_promotions,
        "ordered roster evaluated"
    );

    Ok(TeamSelection::Ordered(OrderedRosterSelection {
        expected_top10: order.iter().map(|&id| top10(id)).collect(),
        bonus_size: settings.bonus_size,
        scoring_size: settings.scoring_size,
        roster,
        evaluation,
    }))
}
