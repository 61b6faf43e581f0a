//! Property tests for tour invariants.
//!
//! Uses proptest to verify, over random rider pools and seeds:
//! 1. Determinism — same setup and seed give identical results
//! 2. Monotonic abandonment — once out, never back, never scoring
//! 3. Stage-delta consistency — per-stage deltas sum to the final total
//! 4. Classification ordering — GC/youth ascending, sprint/mountain descending

use proptest::prelude::*;
use tourlab_core::{
    Abilities, OrderedRosterPolicy, OrderedTables, RaceSetup, Rider, RiderId, RiderRegistry,
    ScoringPolicy, StageTable, TourSimulator,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_rider(index: usize) -> impl Strategy<Value = Rider> {
    (
        (0u32..=100, 0u32..=100, 0u32..=100, 0u32..=100, 0u32..=100),
        prop_oneof![8 => 0.0..0.6_f64, 1 => Just(1.0)],
        19u32..38,
        0usize..5,
        (1u32..=70).prop_map(|p| p as f64 / 10.0),
    )
        .prop_map(move |((s, pu, itt, m, b), p, age, team, price)| Rider {
            name: format!("rider-{index}"),
            team: format!("team-{team}"),
            age,
            price,
            abandon_probability: p,
            abilities: Abilities {
                sprint: s,
                punch: pu,
                itt,
                mountain: m,
                breakaway: b,
            },
        })
}

fn arb_registry() -> impl Strategy<Value = RiderRegistry> {
    (2usize..24)
        .prop_flat_map(|n| (0..n).map(arb_rider).collect::<Vec<_>>())
        .prop_map(|riders| RiderRegistry::new(riders).expect("generated riders are valid"))
}

fn arb_setup() -> impl Strategy<Value = RaceSetup> {
    (arb_registry(), any::<bool>()).prop_map(|(registry, ordered)| {
        let n = registry.len();
        let setup = RaceSetup::new(registry, StageTable::tour_2025());
        if ordered && n >= 3 {
            let roster: Vec<RiderId> = (0..n).rev().map(RiderId).collect();
            let policy =
                OrderedRosterPolicy::new(roster, 1, n - 1, OrderedTables::default()).unwrap();
            setup
                .with_policy(ScoringPolicy::OrderedRoster(policy))
                .unwrap()
        } else {
            setup
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // ── 1. Determinism ───────────────────────────────────────────────

    #[test]
    fn same_seed_same_result(setup in arb_setup(), seed in any::<u64>()) {
        let sim = TourSimulator::new(&setup).unwrap();
        prop_assert_eq!(sim.simulate(seed), sim.simulate(seed));
    }

    // ── 2. Monotonic abandonment ─────────────────────────────────────

    #[test]
    fn abandoned_riders_stay_out(setup in arb_setup(), seed in any::<u64>()) {
        let sim = TourSimulator::new(&setup).unwrap();
        let result = sim.simulate(seed);

        for id in setup.registry().ids() {
            let out_from = result.abandoned_at(id);
            for report in &result.stages {
                let raced = report.placings.iter().any(|p| p.rider == id);
                match out_from {
                    Some(stage) if report.stage >= stage => {
                        prop_assert!(
                            !raced,
                            "{} raced stage {} after abandoning",
                            id,
                            report.stage
                        );
                    }
                    _ => prop_assert!(raced, "{} missing from stage {}", id, report.stage),
                }
            }
            if let Some(stage) = out_from {
                let deltas = result.stage_deltas(id);
                for (snap, delta) in result.ledger.iter().zip(&deltas) {
                    if snap.stage >= stage {
                        prop_assert_eq!(
                            *delta,
                            0,
                            "{} scored on stage {} after abandoning",
                            id,
                            snap.stage
                        );
                    }
                }
                prop_assert!(result.final_standings.gc.iter().all(|e| e.rider != id));
            }
            let p = setup.registry().get(id).abandon_probability;
            if p >= 1.0 {
                prop_assert_eq!(out_from, Some(1));
                prop_assert_eq!(result.total(id), 0);
            }
        }
    }

    // ── 3. Stage-delta consistency ───────────────────────────────────

    #[test]
    fn deltas_sum_to_totals(setup in arb_setup(), seed in any::<u64>()) {
        let sim = TourSimulator::new(&setup).unwrap();
        let result = sim.simulate(seed);
        prop_assert_eq!(result.ledger.len(), setup.ledger_stage_count());
        for id in setup.registry().ids() {
            let sum: u32 = result.stage_deltas(id).iter().sum();
            prop_assert_eq!(sum, result.total(id));
        }
    }

    // ── 4. Classification ordering ───────────────────────────────────

    #[test]
    fn final_standings_are_ordered(setup in arb_setup(), seed in any::<u64>()) {
        let sim = TourSimulator::new(&setup).unwrap();
        let s = sim.simulate(seed).final_standings;

        for w in s.gc.windows(2) {
            prop_assert!(
                w[0].time < w[1].time
                    || (w[0].time == w[1].time && w[0].rider < w[1].rider)
            );
        }
        for w in s.youth.windows(2) {
            prop_assert!(
                w[0].time < w[1].time
                    || (w[0].time == w[1].time && w[0].rider < w[1].rider)
            );
        }
        for w in s.sprint.windows(2) {
            prop_assert!(
                w[0].points > w[1].points
                    || (w[0].points == w[1].points && w[0].rider < w[1].rider)
            );
        }
        for w in s.mountain.windows(2) {
            prop_assert!(
                w[0].points > w[1].points
                    || (w[0].points == w[1].points && w[0].rider < w[1].rider)
            );
        }
        for e in &s.youth {
            prop_assert!(setup.registry().get(e.rider).age < setup.rules().youth_age_limit);
        }
    }
}
