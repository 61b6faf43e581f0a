//! TourLab CLI — simulate, sample, optimize and validate commands.
//!
//! Commands:
//! - `simulate` — run one tour and print the result
//! - `sample` — Monte Carlo per-rider statistics
//! - `optimize` — pick a roster (optionally with stage lineups or a risk sweep)
//! - `ordered` — pick and order a roster for the ordered-roster game
//! - `validate` — check a hand-picked team and print its diagnostics
//! - `compare` — diagnostics of two teams side by side
//!
//! Every command reads a TOML race file and writes JSON to stdout. Logs go to
//! stderr, filtered by `TOURLAB_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tourlab_core::{RaceSetup, TourSimulator};
use tourlab_runner::{
    compare_teams, optimize_ordered_roster, optimize_roster, optimize_with_lineups,
    plan_lineups, risk_profile_sweep, validate_team, ExpectedValueSampler, OptimizerConfig,
    RaceFile, RiskProfile, SampleResult, SamplerConfig, SamplerProgress, TeamDiagnostics,
};

#[derive(Parser)]
#[command(
    name = "tourlab",
    about = "TourLab CLI — stage race simulation and fantasy roster optimization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one tour.
    Simulate {
        /// Race file (TOML).
        #[arg(long)]
        race: PathBuf,

        /// Seed. Defaults to the race file's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Print every stage report instead of the summary.
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    /// Aggregate per-rider statistics over many simulated tours.
    Sample {
        #[arg(long)]
        race: PathBuf,

        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Choose a roster from sampled expected points.
    Optimize {
        #[arg(long)]
        race: PathBuf,

        #[command(flatten)]
        sampling: SamplingArgs,

        #[command(flatten)]
        knobs: KnobArgs,

        /// Also choose the lineup of every stage.
        #[arg(long, default_value_t = false)]
        lineups: bool,

        /// Plan lineups for this fixed roster instead of optimizing one.
        #[arg(long = "rider", conflicts_with_all = ["lineups", "sweep"])]
        riders: Vec<String>,

        /// Optimize once per default risk profile.
        #[arg(long, default_value_t = false)]
        sweep: bool,
    },
    /// Choose and order a roster for the ordered-roster game.
    Ordered {
        #[arg(long)]
        race: PathBuf,

        #[command(flatten)]
        sampling: SamplingArgs,

        #[command(flatten)]
        knobs: KnobArgs,

        /// Simulations used to evaluate the ordered roster.
        #[arg(long)]
        evaluation_runs: Option<usize>,
    },
    /// Validate a team and print its diagnostics.
    Validate {
        #[arg(long)]
        race: PathBuf,

        /// Rider names, one flag per rider.
        #[arg(long = "rider", required = true)]
        riders: Vec<String>,

        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Compare two teams.
    Compare {
        #[arg(long)]
        race: PathBuf,

        /// First team, comma-separated rider names.
        #[arg(long, value_delimiter = ',', required = true)]
        first: Vec<String>,

        /// Second team, comma-separated rider names.
        #[arg(long, value_delimiter = ',', required = true)]
        second: Vec<String>,

        #[command(flatten)]
        sampling: SamplingArgs,
    },
}

#[derive(clap::Args)]
struct SamplingArgs {
    /// Number of simulated tours. Defaults to the race file's setting.
    #[arg(long)]
    simulations: Option<usize>,

    /// Worker threads. Defaults to the race file's setting or all cores.
    #[arg(long)]
    threads: Option<usize>,

    /// Master seed. Defaults to the race file's seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Skip per-stage statistics.
    #[arg(long, default_value_t = false)]
    totals_only: bool,
}

#[derive(clap::Args)]
struct KnobArgs {
    #[arg(long)]
    budget: Option<f64>,

    /// Penalty on the standard deviation of total points, in [0, 1].
    #[arg(long)]
    risk_aversion: Option<f64>,

    /// Penalty on abandonment probability, in [0, 1].
    #[arg(long)]
    abandon_penalty: Option<f64>,
}

/// JSON envelope printed by every command.
#[derive(Serialize)]
struct Output<'a, T: Serialize> {
    command: &'a str,
    generated_at: DateTime<Utc>,
    race: String,
    fingerprint: String,
    result: T,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { race, seed, full } => run_simulate(&race, seed, full),
        Commands::Sample { race, sampling } => run_sample(&race, &sampling),
        Commands::Optimize {
            race,
            sampling,
            knobs,
            lineups,
            riders,
            sweep,
        } => run_optimize(&race, &sampling, &knobs, lineups, &riders, sweep),
        Commands::Ordered {
            race,
            sampling,
            knobs,
            evaluation_runs,
        } => run_ordered(&race, &sampling, &knobs, evaluation_runs),
        Commands::Validate {
            race,
            riders,
            sampling,
        } => run_validate(&race, &riders, &sampling),
        Commands::Compare {
            race,
            first,
            second,
            sampling,
        } => run_compare(&race, &first, &second, &sampling),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TOURLAB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

// ── Helpers ──────────────────────────────────────────────────────────

fn load_race(path: &Path) -> Result<(RaceFile, RaceSetup)> {
    let file = RaceFile::load(path)
        .with_context(|| format!("loading race file {}", path.display()))?;
    let setup = file
        .build_setup()
        .with_context(|| format!("invalid race in {}", path.display()))?;
    Ok((file, setup))
}

fn sampler_config(file: &RaceFile, args: &SamplingArgs) -> SamplerConfig {
    let mut config = file.sampler_config();
    if let Some(n) = args.simulations {
        config.num_simulations = n;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(seed) = args.seed {
        config.master_seed = seed;
    }
    if args.totals_only {
        config.per_stage = false;
    }
    config
}

fn optimizer_config(file: &RaceFile, knobs: &KnobArgs) -> OptimizerConfig {
    let mut config = file.optimizer.clone();
    if let Some(budget) = knobs.budget {
        config.budget = budget;
    }
    if let Some(r) = knobs.risk_aversion {
        config.risk_aversion = r;
    }
    if let Some(p) = knobs.abandon_penalty {
        config.abandon_penalty = p;
    }
    config
}

fn sample(setup: &RaceSetup, config: &SamplerConfig) -> Result<SampleResult> {
    let step = (config.num_simulations / 10).max(1);
    let report = move |p: &SamplerProgress| {
        if p.completed % step == 0 {
            info!(completed = p.completed, total = p.total, "sampling");
        }
    };
    let sampler = ExpectedValueSampler::new(setup.clone());
    Ok(sampler.sample(config, Some(&report))?)
}

fn emit<T: Serialize>(command: &str, race: &Path, setup: &RaceSetup, result: T) -> Result<()> {
    let output = Output {
        command,
        generated_at: Utc::now(),
        race: race.display().to_string(),
        fingerprint: setup.fingerprint().to_hex(),
        result,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TourSummary {
    seed: u64,
    gc_leader: Option<String>,
    sprint_leader: Option<String>,
    mountain_leader: Option<String>,
    youth_leader: Option<String>,
    abandonments: usize,
    top_scorers: Vec<(String, u32)>,
}

fn run_simulate(race: &Path, seed: Option<u64>, full: bool) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let seed = seed.unwrap_or(file.race.seed);
    let result = TourSimulator::new(&setup)?.simulate(seed);
    if full {
        return emit("simulate", race, &setup, &result);
    }

    let registry = setup.registry();
    let name = |id: Option<tourlab_core::RiderId>| id.map(|r| registry.name(r).to_string());
    let mut top: Vec<(String, u32)> = registry
        .ids()
        .map(|id| (registry.name(id).to_string(), result.total(id)))
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(10);

    let standings = &result.final_standings;
    let summary = TourSummary {
        seed,
        gc_leader: name(standings.gc_leader()),
        sprint_leader: name(standings.sprint_leader()),
        mountain_leader: name(standings.mountain_leader()),
        youth_leader: name(standings.youth_leader()),
        abandonments: result.abandonments.len(),
        top_scorers: top,
    };
    emit("simulate", race, &setup, summary)
}

fn run_sample(race: &Path, args: &SamplingArgs) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let config = sampler_config(&file, args);
    let result = sample(&setup, &config)?;
    emit("sample", race, &setup, result)
}

fn run_optimize(
    race: &Path,
    args: &SamplingArgs,
    knobs: &KnobArgs,
    lineups: bool,
    riders: &[String],
    sweep: bool,
) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let mut sampling = sampler_config(&file, args);
    if lineups || !riders.is_empty() {
        sampling.per_stage = true;
    }
    let config = optimizer_config(&file, knobs);
    let sample = sample(&setup, &sampling)?;
    let registry = setup.registry();

    if sweep {
        let entries = risk_profile_sweep(registry, &sample, &config, &RiskProfile::defaults());
        if entries.is_empty() {
            bail!("no risk profile produced a team");
        }
        return emit("optimize", race, &setup, entries);
    }

    let selection = if !riders.is_empty() {
        let ids = validate_team(registry, riders, &config)?;
        plan_lineups(registry, &sample, &ids, &config)?
    } else if lineups {
        optimize_with_lineups(registry, &sample, &config)?
    } else {
        optimize_roster(registry, &sample, &config)?
    };
    if let Some(reason) = &selection.roster().fallback {
        tracing::warn!(%reason, "team chosen by greedy fallback");
    }
    emit("optimize", race, &setup, selection)
}

fn run_ordered(
    race: &Path,
    args: &SamplingArgs,
    knobs: &KnobArgs,
    evaluation_runs: Option<usize>,
) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let sampling = sampler_config(&file, args);
    let config = optimizer_config(&file, knobs);
    let mut settings = file.ordered.clone();
    if let Some(runs) = evaluation_runs {
        settings.evaluation_runs = runs;
    }
    let selection = optimize_ordered_roster(&setup, &sampling, &config, &settings)?;
    emit("ordered", race, &setup, selection)
}

fn run_validate(race: &Path, riders: &[String], args: &SamplingArgs) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let ids = validate_team(setup.registry(), riders, &file.optimizer)?;
    let sample = sample(&setup, &sampler_config(&file, args))?;
    let diagnostics = TeamDiagnostics::analyze(&setup, &sample, &ids, file.optimizer.budget)?;
    emit("validate", race, &setup, diagnostics)
}

fn run_compare(
    race: &Path,
    first: &[String],
    second: &[String],
    args: &SamplingArgs,
) -> Result<()> {
    let (file, setup) = load_race(race)?;
    let config = &file.optimizer;
    let first = validate_team(setup.registry(), first, config).context("first team")?;
    let second = validate_team(setup.registry(), second, config).context("second team")?;
    let sample = sample(&setup, &sampler_config(&file, args))?;
    let a = TeamDiagnostics::analyze(&setup, &sample, &first, config.budget)?;
    let b = TeamDiagnostics::analyze(&setup, &sample, &second, config.budget)?;

    #[derive(Serialize)]
    struct Comparison {
        first: TeamDiagnostics,
        second: TeamDiagnostics,
        delta: tourlab_runner::TeamComparison,
    }
    let delta = compare_teams(&a, &b);
    emit(
        "compare",
        race,
        &setup,
        Comparison {
            first: a,
            second: b,
            delta,
        },
    )
}
