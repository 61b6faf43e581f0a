//! Complete race configuration: riders, stages, tier table, classification
//! rules and scoring policy.

use serde::Serialize;

use crate::domain::{RiderRegistry, StageTable};
use crate::error::ConfigError;
use crate::fingerprint::RaceFingerprint;
use crate::rules::ClassificationRules;
use crate::scoring::{ScoreStage, ScoringPolicy};
use crate::tiers::TierTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSetup {
    registry: RiderRegistry,
    stages: StageTable,
    tiers: TierTable,
    rules: ClassificationRules,
    policy: ScoringPolicy,
}

impl RaceSetup {
    /// Default tiers, rules and the standard scoring policy.
    pub fn new(registry: RiderRegistry, stages: StageTable) -> Self {
        Self {
            registry,
            stages,
            tiers: TierTable::default(),
            rules: ClassificationRules::default(),
            policy: ScoringPolicy::default(),
        }
    }

    pub fn with_tiers(mut self, tiers: TierTable) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_rules(mut self, rules: ClassificationRules) -> Self {
        self.rules = rules;
        self
    }

    /// Switch scoring policy. Point tables are validated and an ordered
    /// roster must name registered riders.
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        if let ScoringPolicy::OrderedRoster(p) = &policy {
            if let Some(unknown) = p
                .roster()
                .unwrap_or(&[])
                .iter()
                .find(|r| r.0 >= self.registry.len())
            {
                return Err(ConfigError::UnknownRider(unknown.to_string()));
            }
        }
        self.policy = policy;
        Ok(self)
    }

    pub fn registry(&self) -> &RiderRegistry {
        &self.registry
    }

    /// Mutable access for edits between runs. The registry re-validates every
    /// edit, so the setup stays consistent.
    pub fn registry_mut(&mut self) -> &mut RiderRegistry {
        &mut self.registry
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Racing stages plus the end-of-race ledger stage when the policy has one.
    pub fn ledger_stage_count(&self) -> usize {
        self.stages.len() + usize::from(self.policy.has_final_awards())
    }

    /// Ledger stage numbers, `1..=S` then `S + 1` for final awards.
    pub fn ledger_stage_numbers(&self) -> Vec<u32> {
        (1..=self.ledger_stage_count() as u32).collect()
    }

    pub fn fingerprint(&self) -> RaceFingerprint {
        RaceFingerprint::of(self)
    }
}
