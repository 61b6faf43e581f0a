//! Per-run seeds.
//!
//! Run `i` of a race is seeded from `(master seed, race fingerprint, i)`.
//! One `StdRng` per run then drives every stage of that run in order:
//! abandonment rolls first, then finishing draws. Because a run's seed depends
//! only on its index, a worker can pick up any run in any order and two
//! samples of the same race with the same master seed replay the same tours.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::fingerprint::RaceFingerprint;

/// Seeds for the runs of one race configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSeeds {
    master_seed: u64,
    race: RaceFingerprint,
}

impl RunSeeds {
    pub fn new(master_seed: u64, race: RaceFingerprint) -> Self {
        Self { master_seed, race }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Seed of run `run`; `TourSimulator::simulate(seed)` replays that run.
    pub fn seed(&self, run: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.race.as_bytes());
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&run.to_le_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng(&self, run: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed(run))
    }
}
