//! End-to-end: race file → sampler → optimizer → diagnostics.

use std::path::PathBuf;
use tourlab_core::{ScoreStage, TourSimulator};
use tourlab_runner::{
    compare_teams, optimize_roster, optimize_with_lineups, plan_lineups, risk_profile_sweep,
    validate_team, ExpectedValueSampler, RaceFile, RiskProfile, SamplerConfig, TeamDiagnostics,
    TeamSelection,
};

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/race.toml")
}

fn small_sampler(seed: u64) -> SamplerConfig {
    SamplerConfig {
        num_simulations: 40,
        master_seed: seed,
        threads: 2,
        per_stage: true,
    }
}

#[test]
fn demo_race_loads_and_simulates() {
    let file = RaceFile::load(&demo_path()).unwrap();
    let setup = file.build_setup().unwrap();
    assert_eq!(setup.registry().len(), 48);
    assert!(setup.policy().has_final_awards());

    let result = TourSimulator::new(&setup).unwrap().simulate(file.race.seed);
    assert_eq!(result.stages.len(), 21);
    assert_eq!(result.ledger.len(), 22);
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("final_standings"));
}

#[test]
fn sample_then_optimize_demo_race() {
    let file = RaceFile::load(&demo_path()).unwrap();
    let setup = file.build_setup().unwrap();
    let sampler = ExpectedValueSampler::new(setup.clone());
    let sample = sampler.sample(&small_sampler(11), None).unwrap();
    assert_eq!(sample.riders.len(), 48);
    assert_eq!(sample.ledger_stages.len(), 22);

    let config = &file.optimizer;
    let team = optimize_roster(setup.registry(), &sample, config).unwrap();
    let roster = team.roster();
    assert_eq!(roster.riders.len(), 20);
    assert!(roster.total_cost <= config.budget + 1e-6);

    // the chosen names pass the same validation a user team goes through
    let names: Vec<&str> = roster.riders.iter().map(|r| r.name.as_str()).collect();
    let ids = validate_team(setup.registry(), &names, config).unwrap();
    assert_eq!(ids, team.rider_ids());

    let diagnostics = TeamDiagnostics::analyze(&setup, &sample, &ids, config.budget).unwrap();
    assert!((diagnostics.expected_points - roster.expected_points).abs() < 1e-6);
    assert!(diagnostics.club_distribution.values().all(|&n| n <= 4));

    let planned = plan_lineups(setup.registry(), &sample, &ids, config).unwrap();
    let TeamSelection::WithLineup(lineups) = &planned else {
        panic!("expected lineups");
    };
    assert_eq!(lineups.lineups.len(), 22);
    assert!(lineups.lineups[..21].iter().all(|l| l.riders.len() == 9));
    assert_eq!(lineups.lineups[21].riders.len(), 20);

    let sweep = risk_profile_sweep(setup.registry(), &sample, config, &RiskProfile::defaults());
    assert_eq!(sweep.len(), 5);
    let cautious: Vec<_> = sweep[3].selection.rider_ids();
    let cautious_diag =
        TeamDiagnostics::analyze(&setup, &sample, &cautious, config.budget).unwrap();
    let cmp = compare_teams(&diagnostics, &cautious_diag);
    assert_eq!(cmp.shared.len() + cmp.only_first.len(), 20);
    assert_eq!(cmp.shared.len() + cmp.only_second.len(), 20);
}

#[test]
fn two_layer_optimization_on_demo_race() {
    let file = RaceFile::load(&demo_path()).unwrap();
    let setup = file.build_setup().unwrap();
    let sample = ExpectedValueSampler::new(setup.clone())
        .sample(&small_sampler(11), None)
        .unwrap();
    let config = &file.optimizer;

    let team = optimize_with_lineups(setup.registry(), &sample, config).unwrap();
    let TeamSelection::WithLineup(selection) = &team else {
        panic!("expected lineups");
    };
    let roster = &selection.roster;
    assert_eq!(roster.fallback, None);
    assert_eq!(roster.riders.len(), config.team_size);
    assert!(roster.total_cost <= config.budget + 1e-6);

    let count = sample.ledger_stages.len();
    assert_eq!(selection.lineups.len(), count);
    for (i, lineup) in selection.lineups.iter().enumerate() {
        assert_eq!(lineup.stage, sample.ledger_stages[i]);
        assert_eq!(lineup.riders.len(), config.lineup_size(i, count));
        assert!(lineup.riders.iter().all(|s| roster.contains(s.rider)));
        let fielded: f64 = lineup.riders.iter().map(|s| s.adjusted_points).sum();
        assert!((lineup.adjusted_points - fielded).abs() < 1e-9);
    }
    let stage_sum: f64 = selection.lineups.iter().map(|l| l.expected_points).sum();
    assert!((selection.expected_points - stage_sum).abs() < 1e-9);

    // the solver's lineups are the best the chosen roster can field
    let objective: f64 = selection.lineups.iter().map(|l| l.adjusted_points).sum();
    let ids = team.rider_ids();
    let replanned = plan_lineups(setup.registry(), &sample, &ids, config).unwrap();
    let TeamSelection::WithLineup(replanned) = &replanned else {
        panic!("expected lineups");
    };
    let best_for_roster: f64 = replanned.lineups.iter().map(|l| l.adjusted_points).sum();
    assert!((objective - best_for_roster).abs() <= 1e-6 * best_for_roster.abs().max(1.0));

    // and no roster-only pick does better once its lineups are planned
    let single = optimize_roster(setup.registry(), &sample, config).unwrap();
    let planned = plan_lineups(setup.registry(), &sample, &single.rider_ids(), config).unwrap();
    let TeamSelection::WithLineup(planned) = &planned else {
        panic!("expected lineups");
    };
    let single_value: f64 = planned.lineups.iter().map(|l| l.adjusted_points).sum();
    assert!(objective >= single_value - 1e-6 * single_value.abs().max(1.0));
}

#[test]
fn two_layer_optimization_on_a_small_race() {
    let file = RaceFile::from_toml_str(
        r#"
[optimizer]
budget = 9.0
team_size = 4
lineup_size_regular = 2
lineup_size_final = 4
max_per_club = 2

[[stages]]
number = 1
weights = { sprint = 1.0 }

[[stages]]
number = 2
weights = { mountain = 1.0 }

[[riders]]
name = "Fast"
team = "A"
age = 26
price = 3.0
abilities = { sprint = 99 }

[[riders]]
name = "High"
team = "B"
age = 27
price = 3.0
abilities = { mountain = 99 }

[[riders]]
name = "Steady"
team = "C"
age = 30
price = 1.0
abilities = { sprint = 60, mountain = 60 }

[[riders]]
name = "Spare"
team = "C"
age = 31
price = 1.0
abilities = { sprint = 40, mountain = 40 }

[[riders]]
name = "Reserve"
team = "D"
age = 22
price = 1.0
abilities = { sprint = 30, mountain = 30 }
"#,
    )
    .unwrap();
    let setup = file.build_setup().unwrap();
    let sample = ExpectedValueSampler::new(setup.clone())
        .sample(&small_sampler(5), None)
        .unwrap();
    let team = optimize_with_lineups(setup.registry(), &sample, &file.optimizer).unwrap();
    let TeamSelection::WithLineup(selection) = &team else {
        panic!("expected lineups");
    };
    assert_eq!(selection.lineups.len(), 3);
    assert_eq!(selection.lineups[0].riders.len(), 2);
    assert_eq!(selection.lineups[2].riders.len(), 4);
    assert!(selection.roster.total_cost <= 9.0);
    let roster = team.rider_ids();
    for lineup in &selection.lineups {
        assert!(lineup.riders.iter().all(|s| roster.contains(&s.rider)));
    }
}
