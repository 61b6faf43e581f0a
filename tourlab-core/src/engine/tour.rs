//! Tour simulator: the stage loop.
//!
//! Per racing stage: abandonment rolls, one draw per remaining rider,
//! classification update, scoring, ledger snapshot. After the last stage the
//! policy may award end-of-race points on one extra ledger stage.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::abandonment::{self, per_stage_probability, AbandonmentEvent};
use super::classification::{self, Standings};
use super::precompute::PrecomputedField;
use super::stage::rank_stage;
use super::state::{LedgerSnapshot, SimulationState, StageReport};
use crate::domain::{ClubIndex, RiderId};
use crate::error::ConfigError;
use crate::race::RaceSetup;
use crate::scoring::{FinalContext, Promotion, ScoreStage, StageContext};
use crate::tiers::AbilityModel;

/// Everything observable about one simulated race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourResult {
    pub seed: u64,
    pub stages: Vec<StageReport>,
    pub abandonments: Vec<AbandonmentEvent>,
    pub final_standings: Standings,
    pub ledger: Vec<LedgerSnapshot>,
    pub totals: Vec<u32>,
    pub promotions: Vec<Promotion>,
}

impl TourResult {
    pub fn total(&self, rider: RiderId) -> u32 {
        self.totals[rider.0]
    }

    /// Points gained on each ledger stage.
    pub fn stage_deltas(&self, rider: RiderId) -> Vec<u32> {
        let mut previous = 0;
        self.ledger
            .iter()
            .map(|snap| {
                let now = snap.cumulative[rider.0];
                let delta = now - previous;
                previous = now;
                delta
            })
            .collect()
    }

    pub fn rank_in_stage(&self, stage: u32, rider: RiderId) -> Option<u32> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)?
            .placings
            .iter()
            .find(|p| p.rider == rider)
            .map(|p| p.rank)
    }

    pub fn abandoned_at(&self, rider: RiderId) -> Option<u32> {
        self.abandonments
            .iter()
            .find(|e| e.rider == rider)
            .map(|e| e.stage)
    }
}

/// Read-only simulator over one [`RaceSetup`]. Shareable across threads; all
/// mutable data lives in the [`SimulationState`] passed to [`TourSimulator::run`].
#[derive(Debug, Clone)]
pub struct TourSimulator<'a> {
    setup: &'a RaceSetup,
    field: PrecomputedField,
    clubs: ClubIndex,
    youth: Vec<bool>,
    time_gaps: Vec<f64>,
    whole_race_abandon: Vec<f64>,
    per_stage_abandon: Vec<f64>,
}

impl<'a> TourSimulator<'a> {
    pub fn new(setup: &'a RaceSetup) -> Result<Self, ConfigError> {
        let registry = setup.registry();
        let stages = setup.stages();
        let rules = setup.rules();
        let model = AbilityModel::new(setup.tiers().clone());

        let field = PrecomputedField::build(registry, stages, &model)?;
        let youth = registry
            .riders()
            .iter()
            .map(|r| r.age < rules.youth_age_limit)
            .collect();
        let time_gaps = stages
            .stages()
            .iter()
            .map(|p| rules.stage_time_gap(p))
            .collect();
        let whole_race_abandon: Vec<f64> = registry
            .riders()
            .iter()
            .map(|r| r.abandon_probability)
            .collect();
        let per_stage_abandon = whole_race_abandon
            .iter()
            .map(|&p| per_stage_probability(p, stages.len()))
            .collect();

        Ok(Self {
            setup,
            field,
            clubs: ClubIndex::new(registry),
            youth,
            time_gaps,
            whole_race_abandon,
            per_stage_abandon,
        })
    }

    pub fn setup(&self) -> &RaceSetup {
        self.setup
    }

    pub fn clubs(&self) -> &ClubIndex {
        &self.clubs
    }

    pub fn field(&self) -> &PrecomputedField {
        &self.field
    }

    /// A state sized for this race.
    pub fn new_state(&self, record_reports: bool) -> SimulationState {
        SimulationState::new(self.setup.registry().len(), record_reports)
    }

    /// Simulate one race into `state`, which is reset first.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R, state: &mut SimulationState) {
        let registry = self.setup.registry();
        let policy = self.setup.policy();
        let rules = self.setup.rules();

        state.reset();
        policy.prepare(state);
        abandonment::withdraw_non_starters(state, &self.whole_race_abandon, 1);

        let mut active = std::mem::take(&mut state.active_buf);
        let mut placings = std::mem::take(&mut state.placings_buf);

        for (idx, profile) in self.setup.stages().stages().iter().enumerate() {
            let stage = profile.number();
            let already_out = state.abandonments.len();
            abandonment::roll_stage(state, rng, &self.per_stage_abandon, stage);

            active.clear();
            active.extend(registry.ids().filter(|&r| state.is_active(r)));
            rank_stage(&active, idx, &self.field, rng, &mut placings);

            classification::apply_stage(
                state,
                rules,
                profile,
                &placings,
                self.time_gaps[idx],
                &self.youth,
            );
            for p in placings.iter().take_while(|p| p.rank <= 10) {
                state.top10_finishes[p.rider.0] += 1;
            }

            let standings = classification::standings(state, &self.youth);
            let ctx = StageContext {
                profile,
                placings: &placings,
                standings: &standings,
                clubs: &self.clubs,
            };
            policy.score_stage(&ctx, state);
            state.close_ledger_stage(stage);

            if state.reports.is_some() {
                // non-starters are logged against stage 1 before the loop
                let from = if idx == 0 { 0 } else { already_out };
                let abandoned = state.abandonments[from..]
                    .iter()
                    .map(|e| e.rider)
                    .collect();
                let report = StageReport {
                    stage,
                    abandoned,
                    placings: placings.clone(),
                    standings,
                };
                if let Some(reports) = state.reports.as_mut() {
                    reports.push(report);
                }
            }
            trace!(stage, finishers = placings.len(), "stage simulated");
        }

        if policy.has_final_awards() {
            let standings = classification::standings(state, &self.youth);
            let ctx = FinalContext {
                standings: &standings,
                clubs: &self.clubs,
            };
            policy.final_awards(&ctx, state);
            state.close_ledger_stage(self.setup.stages().last_number() + 1);
        }

        state.active_buf = active;
        state.placings_buf = placings;
    }

    /// Simulate one race from `seed` and keep every detail.
    pub fn simulate(&self, seed: u64) -> TourResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = self.new_state(true);
        self.run(&mut rng, &mut state);

        let final_standings = classification::standings(&state, &self.youth);
        debug!(
            seed,
            abandonments = state.abandonments.len(),
            "tour simulated"
        );
        TourResult {
            seed,
            stages: state.reports.take().unwrap_or_default(),
            abandonments: state.abandonments.clone(),
            final_standings,
            ledger: std::mem::take(&mut state.ledger_log),
            totals: state.ledger.clone(),
            promotions: state.roster.promotions().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Abilities, Discipline, Rider, RiderRegistry, SprintCategory, StageProfile, StageTable,
    };

    fn make_rider(name: &str, team: &str, score: u32, p: f64) -> Rider {
        Rider {
            name: name.into(),
            team: team.into(),
            age: 23,
            price: 1.0,
            abandon_probability: p,
            abilities: Abilities::uniform(score),
        }
    }

    fn make_setup() -> RaceSetup {
        let riders = vec![
            make_rider("a", "X", 99, 0.0),
            make_rider("b", "X", 80, 0.3),
            make_rider("c", "Y", 60, 0.9),
            make_rider("d", "Y", 40, 1.0),
        ];
        RaceSetup::new(RiderRegistry::new(riders).unwrap(), StageTable::tour_2025())
    }

    #[test]
    fn ledger_has_final_stage_and_matches_totals() {
        let setup = make_setup();
        let sim = TourSimulator::new(&setup).unwrap();
        let result = sim.simulate(5);
        assert_eq!(result.ledger.len(), 22);
        assert_eq!(result.ledger.last().unwrap().stage, 22);
        assert_eq!(result.ledger.last().unwrap().cumulative, result.totals);
        assert_eq!(result.stages.len(), 21);
    }

    #[test]
    fn non_starter_never_races() {
        let setup = make_setup();
        let sim = TourSimulator::new(&setup).unwrap();
        let result = sim.simulate(9);
        assert_eq!(result.abandoned_at(RiderId(3)), Some(1));
        assert!(result.stages[0].abandoned.contains(&RiderId(3)));
        assert!(result
            .stages
            .iter()
            .all(|s| s.placings.iter().all(|p| p.rider != RiderId(3))));
        assert_eq!(result.total(RiderId(3)), 0);
    }

    #[test]
    fn reused_state_matches_fresh_state() {
        let setup = make_setup();
        let sim = TourSimulator::new(&setup).unwrap();

        let mut reused = sim.new_state(false);
        sim.run(&mut StdRng::seed_from_u64(1), &mut reused);
        sim.run(&mut StdRng::seed_from_u64(2), &mut reused);

        let mut fresh = sim.new_state(false);
        sim.run(&mut StdRng::seed_from_u64(2), &mut fresh);

        assert_eq!(reused.ledger(), fresh.ledger());
        assert_eq!(reused.ledger_log(), fresh.ledger_log());
        assert_eq!(reused.abandonments(), fresh.abandonments());
    }

    #[test]
    fn single_stage_race() {
        let riders = vec![make_rider("a", "X", 99, 0.0), make_rider("b", "Y", 10, 0.0)];
        let stages = StageTable::new(vec![StageProfile::new(
            1,
            [(Discipline::Sprint, 1.0)],
            SprintCategory::CategoryOne,
        )
        .unwrap()])
        .unwrap();
        let setup = RaceSetup::new(RiderRegistry::new(riders).unwrap(), stages);
        let sim = TourSimulator::new(&setup).unwrap();
        let result = sim.simulate(3);
        assert_eq!(result.ledger.len(), 2);
        assert_eq!(result.stages[0].placings.len(), 2);
    }
}
