//! Abandonment: a rider's whole-race probability spread over the racing
//! stages as independent per-stage Bernoulli events.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::SimulationState;
use crate::domain::RiderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonmentCause {
    /// Whole-race probability of 1: never starts.
    NonStarter,
    /// Per-stage roll.
    Crash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonmentEvent {
    pub rider: RiderId,
    /// First stage the rider does not start.
    pub stage: u32,
    pub cause: AbandonmentCause,
}

/// `q = 1 - (1 - p)^(1/S)`: the per-stage probability that compounds to `p`
/// over `stages` independent stages.
pub fn per_stage_probability(p: f64, stages: usize) -> f64 {
    if p <= 0.0 || stages == 0 {
        0.0
    } else if p >= 1.0 {
        1.0
    } else {
        1.0 - (1.0 - p).powf(1.0 / stages as f64)
    }
}

/// Remove riders whose whole-race probability is 1 before the first stage.
pub(crate) fn withdraw_non_starters(
    state: &mut SimulationState,
    whole_race: &[f64],
    first_stage: u32,
) {
    for (i, &p) in whole_race.iter().enumerate() {
        if p >= 1.0 {
            state.abandon(AbandonmentEvent {
                rider: RiderId(i),
                stage: first_stage,
                cause: AbandonmentCause::NonStarter,
            });
        }
    }
}

/// Roll every still-active rider before `stage`. One uniform draw per active
/// rider, in rider order, so the random stream is reproducible.
pub(crate) fn roll_stage<R: Rng + ?Sized>(
    state: &mut SimulationState,
    rng: &mut R,
    per_stage: &[f64],
    stage: u32,
) {
    for (i, &q) in per_stage.iter().enumerate() {
        let rider = RiderId(i);
        if !state.is_active(rider) {
            continue;
        }
        if rng.gen::<f64>() < q {
            state.abandon(AbandonmentEvent {
                rider,
                stage,
                cause: AbandonmentCause::Crash,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn per_stage_compounds_back_to_whole_race() {
        for &p in &[0.05, 0.3, 0.9] {
            for &s in &[1usize, 7, 21] {
                let q = per_stage_probability(p, s);
                let survive = (1.0 - q).powi(s as i32);
                assert!((1.0 - survive - p).abs() < 1e-12, "p={p} s={s}");
            }
        }
    }

    #[test]
    fn edge_probabilities() {
        assert_eq!(per_stage_probability(0.0, 21), 0.0);
        assert_eq!(per_stage_probability(1.0, 21), 1.0);
        assert_eq!(per_stage_probability(0.5, 0), 0.0);
    }

    #[test]
    fn non_starters_leave_before_stage_one() {
        let mut state = SimulationState::new(3, false);
        withdraw_non_starters(&mut state, &[0.0, 1.0, 0.4], 1);
        assert!(state.is_active(RiderId(0)));
        assert_eq!(state.abandoned_at(RiderId(1)), Some(1));
        assert!(state.is_active(RiderId(2)));
        assert_eq!(state.abandonments()[0].cause, AbandonmentCause::NonStarter);
    }

    #[test]
    fn certain_and_impossible_rolls() {
        let mut state = SimulationState::new(2, false);
        let mut rng = StdRng::seed_from_u64(11);
        roll_stage(&mut state, &mut rng, &[1.0, 0.0], 3);
        assert_eq!(state.abandoned_at(RiderId(0)), Some(3));
        assert!(state.is_active(RiderId(1)));

        // already out: a later roll does not move the stage
        roll_stage(&mut state, &mut rng, &[1.0, 0.0], 4);
        assert_eq!(state.abandoned_at(RiderId(0)), Some(3));
    }
}
