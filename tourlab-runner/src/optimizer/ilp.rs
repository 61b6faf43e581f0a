//! MILP formulations solved with `good_lp` (pure-Rust `microlp` backend).
//!
//! Roster layer: `select[r]` binary.
//! 1. `Σ select = team_size`
//! 2. `Σ price × select ≤ budget`
//! 3. per club `Σ select ≤ max_per_club` (and `≥ min` where configured)
//!
//! Lineup layer adds `lineup[r,s]` binary with `lineup[r,s] ≤ select[r]` and
//! `Σ_r lineup[r,s] = lineup_size(s)`; the objective moves from adjusted
//! totals to adjusted stage points of fielded riders.

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::debug;

use super::{CandidatePool, OptimizerConfig};

/// Solver verdict before verification.
#[derive(Debug)]
pub(crate) enum IlpOutcome {
    Solved(IlpSolution),
    Infeasible,
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct IlpSolution {
    /// Candidate indices, ascending.
    pub selected: Vec<usize>,
    /// Per ledger stage, fielded candidate indices. Empty for the roster-only model.
    pub lineups: Vec<Vec<usize>>,
}

struct RosterModel {
    vars: ProblemVariables,
    select: Vec<Variable>,
}

fn roster_variables(pool: &CandidatePool<'_>) -> RosterModel {
    let mut vars = ProblemVariables::new();
    let select = pool
        .candidates
        .iter()
        .map(|_| vars.add(variable().binary()))
        .collect();
    RosterModel { vars, select }
}

/// Constraints 1–3 plus club minimums on `select`.
fn with_roster_constraints<M: SolverModel>(
    mut model: M,
    pool: &CandidatePool<'_>,
    select: &[Variable],
    config: &OptimizerConfig,
) -> M {
    let team_size = config.team_size as f64;
    let budget = config.budget;
    let max_per_club = config.max_per_club as f64;

    let size: Expression = select.iter().copied().sum();
    model = model.with(constraint!(size == team_size));

    let cost: Expression = pool
        .candidates
        .iter()
        .zip(select)
        .map(|(c, &v)| v * c.price)
        .sum();
    model = model.with(constraint!(cost <= budget));

    for club in 0..pool.clubs.len() {
        let members: Expression = pool
            .clubs
            .members(club)
            .iter()
            .map(|r| select[r.0])
            .sum();
        let minimum = pool
            .club_minimums
            .iter()
            .find(|(c, _)| *c == club)
            .map(|(_, min)| *min as f64);
        if let Some(minimum) = minimum {
            model = model.with(constraint!(members.clone() >= minimum));
        }
        model = model.with(constraint!(members <= max_per_club));
    }
    model
}

fn selected_indices<S: Solution>(solution: &S, select: &[Variable]) -> Vec<usize> {
    select
        .iter()
        .enumerate()
        .filter(|&(_, &v)| solution.value(v) > 0.5)
        .map(|(i, _)| i)
        .collect()
}

fn classify(err: ResolutionError) -> IlpOutcome {
    match err {
        ResolutionError::Infeasible => IlpOutcome::Infeasible,
        other => IlpOutcome::Failed(other.to_string()),
    }
}

/// Roster-only model: maximize the sum of adjusted totals.
pub(crate) fn solve_roster(pool: &CandidatePool<'_>, config: &OptimizerConfig) -> IlpOutcome {
    let RosterModel { vars, select } = roster_variables(pool);
    let objective: Expression = pool
        .candidates
        .iter()
        .zip(&select)
        .map(|(c, &v)| v * c.adjusted)
        .sum();

    let model = with_roster_constraints(
        vars.maximise(objective).using(microlp),
        pool,
        &select,
        config,
    );
    debug!(variables = select.len(), "roster model built");

    match model.solve() {
        Ok(solution) => IlpOutcome::Solved(IlpSolution {
            selected: selected_indices(&solution, &select),
            lineups: Vec::new(),
        }),
        Err(err) => classify(err),
    }
}

/// Two-layer model: roster and every ledger stage's lineup.
pub(crate) fn solve_with_lineups(
    pool: &CandidatePool<'_>,
    config: &OptimizerConfig,
) -> IlpOutcome {
    let RosterModel { mut vars, select } = roster_variables(pool);
    let stage_count = pool.ledger_stages.len();
    let lineup: Vec<Vec<Variable>> = (0..stage_count)
        .map(|_| {
            pool.candidates
                .iter()
                .map(|_| vars.add(variable().binary()))
                .collect()
        })
        .collect();

    let objective: Expression = lineup
        .iter()
        .enumerate()
        .flat_map(|(k, stage)| {
            stage
                .iter()
                .zip(&pool.candidates)
                .map(move |(&v, c)| v * c.stage_adjusted[k])
        })
        .sum();

    let mut model = with_roster_constraints(
        vars.maximise(objective).using(microlp),
        pool,
        &select,
        config,
    );
    for (k, stage) in lineup.iter().enumerate() {
        for (&fielded, &selected) in stage.iter().zip(&select) {
            model = model.with(constraint!(fielded <= selected));
        }
        let size = config.lineup_size(k, stage_count) as f64;
        let fielded: Expression = stage.iter().copied().sum();
        model = model.with(constraint!(fielded == size));
    }
    debug!(
        variables = select.len() * (stage_count + 1),
        stages = stage_count,
        "lineup model built"
    );

    match model.solve() {
        Ok(solution) => IlpOutcome::Solved(IlpSolution {
            selected: selected_indices(&solution, &select),
            lineups: lineup
                .iter()
                .map(|stage| selected_indices(&solution, stage))
                .collect(),
        }),
        Err(err) => classify(err),
    }
}
