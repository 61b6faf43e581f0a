//! Expected-value sampler — Monte Carlo over whole tours.
//!
//! Runs the tour simulator N times and aggregates, per rider, the final
//! fantasy totals (mean, median, mode, std, min, max), abandonment rate,
//! top-10 finishes and optionally per-ledger-stage point deltas.
//!
//! Runs are split into fixed chunks dispatched to a rayon pool. Each chunk
//! reuses one `SimulationState`; run `i` draws from an RNG derived from
//! `(master seed, race fingerprint, i)`, so results do not depend on thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use tourlab_core::{ConfigError, RaceSetup, RiderId, RunSeeds, SimulationState, TourSimulator};

use crate::stats::{Moments, Summary};

/// Runs handled by one worker before it reports back.
const CHUNK_SIZE: usize = 32;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of simulated tours. Chosen by the caller.
    pub num_simulations: usize,
    /// Root of the RNG hierarchy.
    pub master_seed: u64,
    /// Worker threads; 0 or 1 runs on the calling thread.
    pub threads: usize,
    /// Aggregate per-ledger-stage deltas as well as totals.
    pub per_stage: bool,
}

impl SamplerConfig {
    pub fn new(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            master_seed: 42,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            per_stage: true,
        }
    }
}

/// Progress report passed to the callback after every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerProgress {
    pub completed: usize,
    pub total: usize,
}

pub type ProgressCallback<'a> = &'a (dyn Fn(&SamplerProgress) + Sync);

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    /// Ledger stage number (`S + 1` is end-of-race awards).
    pub stage: u32,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderStats {
    pub rider: RiderId,
    pub name: String,
    pub team: String,
    pub price: f64,
    pub abandon_probability: f64,
    pub points: Summary,
    /// Share of runs in which the rider abandoned.
    pub abandon_rate: f64,
    /// Mean number of top-10 stage finishes per run.
    pub mean_top10: f64,
    /// Empty unless per-stage aggregation was requested.
    pub stages: Vec<StageStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub num_simulations: usize,
    pub master_seed: u64,
    /// Hex fingerprint of the race setup that was sampled.
    pub fingerprint: String,
    pub ledger_stages: Vec<u32>,
    pub riders: Vec<RiderStats>,
}

impl SampleResult {
    pub fn rider(&self, id: RiderId) -> Option<&RiderStats> {
        self.riders.get(id.0).filter(|r| r.rider == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&RiderStats> {
        self.riders.iter().find(|r| r.name == name)
    }
}

/// Team-level outcome of simulating a fixed roster under the race's policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEvaluation {
    pub simulations: usize,
    pub points: Summary,
    /// Mean number of roster riders who abandoned.
    pub mean_abandonments: f64,
    /// Mean number of reserve promotions (ordered roster only).
    pub mean_promotions: f64,
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

// ─── Sampler ─────────────────────────────────────────────────────────

/// Owns the race setup. Callers may edit riders between `sample` calls;
/// every call rebuilds the simulator from the current setup.
#[derive(Debug, Clone)]
pub struct ExpectedValueSampler {
    setup: RaceSetup,
}

/// Per-chunk accumulator for `sample`.
struct FieldChunk {
    totals: Vec<Vec<u32>>,
    abandoned: Vec<u64>,
    top10: Vec<u64>,
    stage_moments: Vec<Moments>,
}

impl ExpectedValueSampler {
    pub fn new(setup: RaceSetup) -> Self {
        Self { setup }
    }

    pub fn setup(&self) -> &RaceSetup {
        &self.setup
    }

    pub fn setup_mut(&mut self) -> &mut RaceSetup {
        &mut self.setup
    }

    pub fn into_setup(self) -> RaceSetup {
        self.setup
    }

    /// Per-rider statistics over `config.num_simulations` tours.
    pub fn sample(
        &self,
        config: &SamplerConfig,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<SampleResult, SamplerError> {
        let sim = TourSimulator::new(&self.setup)?;
        let riders = self.setup.registry().len();
        let ledger_stages = self.setup.ledger_stage_numbers();
        let stage_count = ledger_stages.len();
        let per_stage = config.per_stage;

        info!(
            simulations = config.num_simulations,
            riders,
            threads = config.threads,
            "sampling tours"
        );

        let chunks = self.run_chunks(
            &sim,
            config,
            progress,
            || FieldChunk {
                totals: Vec::with_capacity(CHUNK_SIZE),
                abandoned: vec![0; riders],
                top10: vec![0; riders],
                stage_moments: if per_stage {
                    vec![Moments::default(); riders * stage_count]
                } else {
                    Vec::new()
                },
            },
            |acc, state| {
                acc.totals.push(state.ledger().to_vec());
                for r in 0..riders {
                    if !state.is_active(RiderId(r)) {
                        acc.abandoned[r] += 1;
                    }
                    acc.top10[r] += state.top10_finishes()[r] as u64;
                }
                if per_stage {
                    let mut previous = vec![0u32; riders];
                    for (k, snap) in state.ledger_log().iter().enumerate() {
                        for r in 0..riders {
                            let now = snap.cumulative[r];
                            acc.stage_moments[r * stage_count + k].push(now - previous[r]);
                            previous[r] = now;
                        }
                    }
                }
            },
        )?;

        // Merge in chunk order.
        let n = config.num_simulations;
        let mut per_rider: Vec<Vec<u32>> = vec![Vec::with_capacity(n); riders];
        let mut abandoned = vec![0u64; riders];
        let mut top10 = vec![0u64; riders];
        let moment_slots = if per_stage { riders * stage_count } else { 0 };
        let mut stage_moments = vec![Moments::default(); moment_slots];
        for chunk in &chunks {
            for run in &chunk.totals {
                for (r, &total) in run.iter().enumerate() {
                    per_rider[r].push(total);
                }
            }
            for r in 0..riders {
                abandoned[r] += chunk.abandoned[r];
                top10[r] += chunk.top10[r];
            }
            for (m, c) in stage_moments.iter_mut().zip(&chunk.stage_moments) {
                m.merge(c);
            }
        }

        let runs = n.max(1) as f64;
        let stats = self
            .setup
            .registry()
            .iter()
            .map(|(id, rider)| {
                let r = id.0;
                let stages = if per_stage {
                    ledger_stages
                        .iter()
                        .enumerate()
                        .map(|(k, &stage)| {
                            let m = &stage_moments[r * stage_count + k];
                            StageStats {
                                stage,
                                mean: m.mean(),
                                std: m.std(),
                            }
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                RiderStats {
                    rider: id,
                    name: rider.name.clone(),
                    team: rider.team.clone(),
                    price: rider.price,
                    abandon_probability: rider.abandon_probability,
                    points: Summary::of(&per_rider[r]),
                    abandon_rate: abandoned[r] as f64 / runs,
                    mean_top10: top10[r] as f64 / runs,
                    stages,
                }
            })
            .collect();

        Ok(SampleResult {
            num_simulations: n,
            master_seed: config.master_seed,
            fingerprint: self.setup.fingerprint().to_hex(),
            ledger_stages,
            riders: stats,
        })
    }

    /// Simulate the race's own policy and sum the points of `roster`. Run `i`
    /// replays run `i` of [`ExpectedValueSampler::sample`] with the same
    /// master seed, so the team mean is the sum of the riders' means.
    pub fn evaluate_team(
        &self,
        config: &SamplerConfig,
        roster: &[RiderId],
    ) -> Result<TeamEvaluation, SamplerError> {
        let sim = TourSimulator::new(&self.setup)?;
        let roster = roster.to_vec();

        let chunks = self.run_chunks(
            &sim,
            config,
            None,
            || (Vec::with_capacity(CHUNK_SIZE), 0u64, 0u64),
            |(totals, abandons, promotions), state| {
                totals.push(roster.iter().map(|r| state.ledger()[r.0]).sum::<u32>());
                *abandons += roster.iter().filter(|r| !state.is_active(**r)).count() as u64;
                *promotions += state.roster().promotions().len() as u64;
            },
        )?;

        let mut totals = Vec::with_capacity(config.num_simulations);
        let (mut abandons, mut promotions) = (0u64, 0u64);
        for (t, a, p) in chunks {
            totals.extend(t);
            abandons += a;
            promotions += p;
        }
        let runs = config.num_simulations.max(1) as f64;
        Ok(TeamEvaluation {
            simulations: config.num_simulations,
            points: Summary::of(&totals),
            mean_abandonments: abandons as f64 / runs,
            mean_promotions: promotions as f64 / runs,
        })
    }

    /// Run every simulation, folding each finished state into a per-chunk
    /// accumulator. Chunks come back in run order.
    fn run_chunks<A, I, F>(
        &self,
        sim: &TourSimulator<'_>,
        config: &SamplerConfig,
        progress: Option<ProgressCallback<'_>>,
        init: I,
        accumulate: F,
    ) -> Result<Vec<A>, SamplerError>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, &SimulationState) + Sync,
    {
        let total = config.num_simulations;
        let seeds = RunSeeds::new(config.master_seed, self.setup.fingerprint());
        let completed = AtomicUsize::new(0);
        let chunk_count = total.div_ceil(CHUNK_SIZE);

        let run_chunk = |chunk: usize| -> A {
            let mut acc = init();
            let mut state = sim.new_state(false);
            let start = chunk * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE).min(total);
            for i in start..end {
                let mut rng = seeds.rng(i as u64);
                sim.run(&mut rng, &mut state);
                accumulate(&mut acc, &state);
                if let Some(cb) = progress {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    cb(&SamplerProgress { completed: done, total });
                }
            }
            acc
        };

        let chunks: Vec<A> = if config.threads <= 1 {
            (0..chunk_count).map(run_chunk).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()
                .map_err(|e| SamplerError::ThreadPool(e.to_string()))?;
            pool.install(|| (0..chunk_count).into_par_iter().map(run_chunk).collect())
        };
        debug!(runs = total, chunks = chunk_count, "simulations complete");
        Ok(chunks)
    }
}
