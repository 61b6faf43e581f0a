//! Stage simulator: one independent draw per active rider, sorted ascending.

use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};

use super::precompute::PrecomputedField;
use crate::domain::RiderId;

/// One finisher of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placing {
    pub rider: RiderId,
    /// 1-based finishing position.
    pub rank: u32,
    /// Raw draw from the rider's blended distribution; lower is better.
    pub sample: f64,
}

/// Rank `active` riders for stage `stage_index` into `out`.
///
/// Draws happen in `active` order. The sort is stable, so equal samples keep
/// that order.
pub fn rank_stage<R: Rng + ?Sized>(
    active: &[RiderId],
    stage_index: usize,
    field: &PrecomputedField,
    rng: &mut R,
    out: &mut Vec<Placing>,
) {
    out.clear();
    out.extend(active.iter().map(|&rider| Placing {
        rider,
        rank: 0,
        sample: field.sampler(stage_index, rider).sample(rng),
    }));
    out.sort_by(|a, b| a.sample.total_cmp(&b.sample));
    for (i, placing) in out.iter_mut().enumerate() {
        placing.rank = i as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Abilities, Discipline, Rider, RiderRegistry, SprintCategory, StageProfile, StageTable,
    };
    use crate::tiers::AbilityModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_field(scores: &[u32]) -> PrecomputedField {
        let riders = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| Rider {
                name: format!("r{i}"),
                team: "T".into(),
                age: 28,
                price: 1.0,
                abandon_probability: 0.0,
                abilities: Abilities::uniform(s),
            })
            .collect();
        let reg = RiderRegistry::new(riders).unwrap();
        let stages = StageTable::new(vec![StageProfile::new(
            1,
            [(Discipline::Sprint, 1.0)],
            SprintCategory::CategoryOne,
        )
        .unwrap()])
        .unwrap();
        PrecomputedField::build(&reg, &stages, &AbilityModel::default()).unwrap()
    }

    #[test]
    fn ranks_are_dense_and_sorted() {
        let field = make_field(&[99, 80, 60, 10, 95]);
        let active: Vec<RiderId> = (0..5).map(RiderId).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = Vec::new();
        rank_stage(&active, 0, &field, &mut rng, &mut out);

        assert_eq!(out.len(), 5);
        for (i, p) in out.iter().enumerate() {
            assert_eq!(p.rank, i as u32 + 1);
        }
        assert!(out.windows(2).all(|w| w[0].sample <= w[1].sample));
    }

    #[test]
    fn only_active_riders_are_ranked() {
        let field = make_field(&[99, 80, 60]);
        let active = vec![RiderId(0), RiderId(2)];
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = Vec::new();
        rank_stage(&active, 0, &field, &mut rng, &mut out);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.rider != RiderId(1)));
    }

    #[test]
    fn same_seed_same_order() {
        let field = make_field(&[90, 90, 90, 90]);
        let active: Vec<RiderId> = (0..4).map(RiderId).collect();
        let mut a = Vec::new();
        let mut b = Vec::new();
        rank_stage(&active, 0, &field, &mut StdRng::seed_from_u64(3), &mut a);
        rank_stage(&active, 0, &field, &mut StdRng::seed_from_u64(3), &mut b);
        assert_eq!(a, b);
    }
}
