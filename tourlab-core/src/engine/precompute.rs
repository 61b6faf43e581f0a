//! Per-(stage, rider) finishing-rank distributions, built once per race setup.
//!
//! Blending tier triples is pure arithmetic on configuration, so it happens
//! here instead of inside every simulated stage.

use rand_distr::Triangular;

use crate::domain::{RiderId, RiderRegistry, StageTable};
use crate::error::ConfigError;
use crate::tiers::{AbilityModel, RankDistribution};

/// Stage-major table of blended distributions.
#[derive(Debug, Clone)]
pub struct PrecomputedField {
    riders: usize,
    blended: Vec<RankDistribution>,
    samplers: Vec<Triangular<f64>>,
}

impl PrecomputedField {
    pub fn build(
        registry: &RiderRegistry,
        stages: &StageTable,
        model: &AbilityModel,
    ) -> Result<Self, ConfigError> {
        let riders = registry.len();
        let mut blended = Vec::with_capacity(riders * stages.len());
        let mut samplers = Vec::with_capacity(riders * stages.len());
        for profile in stages.stages() {
            for rider in registry.riders() {
                let dist = model.blend(&rider.abilities, profile);
                samplers.push(dist.to_triangular()?);
                blended.push(dist);
            }
        }
        Ok(Self {
            riders,
            blended,
            samplers,
        })
    }

    pub fn sampler(&self, stage_index: usize, rider: RiderId) -> &Triangular<f64> {
        &self.samplers[stage_index * self.riders + rider.0]
    }

    pub fn blended(&self, stage_index: usize, rider: RiderId) -> RankDistribution {
        self.blended[stage_index * self.riders + rider.0]
    }
}
