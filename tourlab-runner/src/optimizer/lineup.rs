//! Lineup planning for a roster the user already picked.

use tracing::info;

use tourlab_core::{RiderId, RiderRegistry};

use super::{
    CandidatePool, LineupSelection, OptimizerConfig, OptimizerError, RosterSelection,
    TeamSelection,
};
use crate::analysis::check_roster;
use crate::sampler::SampleResult;

/// Best lineup per ledger stage for a fixed `roster`: the top
/// `lineup_size(s)` riders by adjusted stage points. The roster itself must
/// satisfy size, budget and club constraints.
pub fn plan_lineups(
    registry: &RiderRegistry,
    sample: &SampleResult,
    roster: &[RiderId],
    config: &OptimizerConfig,
) -> Result<TeamSelection, OptimizerError> {
    config.validate()?;
    check_roster(registry, roster, config)?;
    let pool = CandidatePool::build(registry, sample, config)?;
    if !pool.has_stage_stats(sample) {
        return Err(OptimizerError::MissingStageStats);
    }

    let chosen: Vec<usize> = roster.iter().map(|r| r.0).collect();
    let lineups = pool.best_lineups(&chosen, config);
    info!(
        riders = chosen.len(),
        stages = lineups.len(),
        "planned lineups for fixed roster"
    );
    let selection = RosterSelection::build(&pool, &chosen, config, None);
    Ok(TeamSelection::WithLineup(LineupSelection::build(
        &pool, selection, &lineups,
    )))
}
