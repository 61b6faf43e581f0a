//! Scenario tests: small hand-built races with known expected behavior.

use tourlab_core::engine::AbandonmentCause;
use tourlab_core::{
    Abilities, Discipline, OrderedRosterPolicy, OrderedTables, RaceSetup, Rider, RiderId,
    RiderRegistry, ScoringPolicy, SprintCategory, StageProfile, StageTable, TourSimulator,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_rider(name: &str, team: &str, score: u32, p: f64) -> Rider {
    Rider {
        name: name.into(),
        team: team.into(),
        age: 27,
        price: 2.0,
        abandon_probability: p,
        abilities: Abilities::uniform(score),
    }
}

fn sprint_stage() -> StageTable {
    StageTable::new(vec![StageProfile::new(
        1,
        [(Discipline::Sprint, 1.0)],
        SprintCategory::CategoryOne,
    )
    .unwrap()])
    .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn exceptional_rider_beats_below_average_rider_on_average() {
    let registry = RiderRegistry::new(vec![
        make_rider("A", "X", 99, 0.0),
        make_rider("B", "Y", 10, 0.0),
    ])
    .unwrap();
    let setup = RaceSetup::new(registry, sprint_stage());
    let sim = TourSimulator::new(&setup).unwrap();

    let runs = 1_000;
    let (mut rank_a, mut rank_b) = (0u64, 0u64);
    for seed in 0..runs {
        let result = sim.simulate(seed);
        rank_a += result.rank_in_stage(1, RiderId(0)).unwrap() as u64;
        rank_b += result.rank_in_stage(1, RiderId(1)).unwrap() as u64;
    }
    let mean_a = rank_a as f64 / runs as f64;
    let mean_b = rank_b as f64 / runs as f64;
    assert!(mean_a < mean_b, "A {mean_a} vs B {mean_b}");
}

#[test]
fn certain_abandonment_excludes_rider_every_run() {
    let registry = RiderRegistry::new(vec![
        make_rider("fit", "X", 80, 0.0),
        make_rider("injured", "X", 99, 1.0),
        make_rider("other", "Y", 70, 0.2),
    ])
    .unwrap();
    let setup = RaceSetup::new(registry, StageTable::tour_2025());
    let sim = TourSimulator::new(&setup).unwrap();

    for seed in 0..50 {
        let result = sim.simulate(seed);
        let event = result
            .abandonments
            .iter()
            .find(|e| e.rider == RiderId(1))
            .unwrap();
        assert_eq!(event.stage, 1);
        assert_eq!(event.cause, AbandonmentCause::NonStarter);
        assert_eq!(result.total(RiderId(1)), 0);
        assert!(result.rank_in_stage(1, RiderId(1)).is_none());
    }
}

#[test]
fn teammate_of_non_starter_still_scores_normally() {
    let registry = RiderRegistry::new(vec![
        make_rider("solo", "X", 99, 0.0),
        make_rider("gone", "X", 99, 1.0),
    ])
    .unwrap();
    let setup = RaceSetup::new(registry, sprint_stage());
    let result = TourSimulator::new(&setup).unwrap().simulate(1);
    // wins the stage, leads every classification it is eligible for, then
    // collects every final award; nobody to pass teammate bonuses to
    assert_eq!(result.rank_in_stage(1, RiderId(0)), Some(1));
    assert!(result.total(RiderId(0)) > 0);
    assert_eq!(result.total(RiderId(1)), 0);
}

#[test]
fn ordered_roster_promotes_reserve_after_non_starter() {
    let registry = RiderRegistry::new(vec![
        make_rider("first", "X", 90, 1.0),
        make_rider("second", "Y", 90, 0.0),
        make_rider("reserve", "Z", 90, 0.0),
        make_rider("outsider", "W", 90, 0.0),
    ])
    .unwrap();
    let policy = OrderedRosterPolicy::new(
        vec![RiderId(0), RiderId(1), RiderId(2)],
        1,
        2,
        OrderedTables::default(),
    )
    .unwrap();
    let setup = RaceSetup::new(registry, StageTable::tour_2025())
        .with_policy(ScoringPolicy::OrderedRoster(policy))
        .unwrap();
    let result = TourSimulator::new(&setup).unwrap().simulate(17);

    assert_eq!(result.promotions.len(), 1);
    let promo = result.promotions[0];
    assert_eq!(promo.stage, 1);
    assert_eq!(promo.abandoned, RiderId(0));
    assert_eq!(promo.position, 1);
    assert_eq!(promo.promoted, Some(RiderId(2)));
    // not on the roster: never scores
    assert_eq!(result.total(RiderId(3)), 0);
    assert_eq!(result.ledger.len(), 21);
}
