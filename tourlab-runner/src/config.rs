//! TOML race files.
//!
//! One file describes a whole race: riders, optional stage table (defaults to
//! the 2025 Tour), tier overrides, classification rules, scoring policy,
//! optimizer knobs and sampler settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use tourlab_core::{
    ClassificationRules, ConfigError, OrderedRosterPolicy, OrderedTables, RaceSetup,
    RankDistribution, Rider, RiderRegistry, ScoringPolicy, SprintCategory, StageProfile,
    StageTable, StandardPolicy, StandardTables, TierTable,
};

use crate::optimizer::ordered::OrderedSettings;
use crate::optimizer::{OptimizerConfig, OptimizerError};
use crate::sampler::SamplerConfig;

#[derive(Debug, Error)]
pub enum RaceFileError {
    #[error("read race file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse race file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize race file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSection {
    /// Master seed for single runs and sampling.
    pub seed: u64,
    /// Overrides `rules.youth_age_limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youth_age_limit: Option<u32>,
}

impl Default for RaceSection {
    fn default() -> Self {
        Self {
            seed: 42,
            youth_age_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySection {
    Standard {
        #[serde(default)]
        tables: StandardTables,
    },
    OrderedRoster {
        /// Rider names in roster order.
        roster: Vec<String>,
        #[serde(default = "default_bonus_size")]
        bonus_size: usize,
        #[serde(default = "default_scoring_size")]
        scoring_size: usize,
        #[serde(default)]
        tables: OrderedTables,
    },
}

fn default_bonus_size() -> usize {
    OrderedRosterPolicy::DEFAULT_BONUS_SIZE
}

fn default_scoring_size() -> usize {
    OrderedRosterPolicy::DEFAULT_SCORING_SIZE
}

impl Default for PolicySection {
    fn default() -> Self {
        PolicySection::Standard {
            tables: StandardTables::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub number: u32,
    /// Derived from the dominant discipline when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_category: Option<SprintCategory>,
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSection {
    pub num_simulations: usize,
    /// Defaults to the available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    pub per_stage: bool,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            num_simulations: 1000,
            threads: None,
            per_stage: true,
        }
    }
}

// ─── Race file ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceFile {
    #[serde(default)]
    pub race: RaceSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub sampler: SamplerSection,
    #[serde(default)]
    pub ordered: OrderedSettings,
    #[serde(default)]
    pub rules: ClassificationRules,
    /// Tier name → `{min, mode, max}` overrides.
    #[serde(default)]
    pub tiers: BTreeMap<String, RankDistribution>,
    /// Empty means the 2025 Tour table.
    #[serde(default)]
    pub stages: Vec<StageEntry>,
    pub riders: Vec<Rider>,
}

impl RaceFile {
    pub fn load(path: &Path) -> Result<Self, RaceFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| RaceFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), riders = file.riders.len(), "race file loaded");
        Ok(file)
    }

    /// Parse and check optimizer knobs. Race contents are checked by
    /// [`RaceFile::build_setup`].
    pub fn from_toml_str(content: &str) -> Result<Self, RaceFileError> {
        let file: RaceFile = toml::from_str(content)?;
        file.optimizer.validate()?;
        Ok(file)
    }

    pub fn to_toml_string(&self) -> Result<String, RaceFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validated race setup with every section applied.
    pub fn build_setup(&self) -> Result<RaceSetup, RaceFileError> {
        let registry = RiderRegistry::new(self.riders.clone())?;

        let stages = if self.stages.is_empty() {
            StageTable::tour_2025()
        } else {
            StageTable::new(
                self.stages
                    .iter()
                    .map(|s| StageProfile::from_named(s.number, &s.weights, s.sprint_category))
                    .collect::<Result<Vec<_>, _>>()?,
            )?
        };

        let tiers = TierTable::default().with_overrides(&self.tiers)?;
        let mut rules = self.rules.clone();
        if let Some(limit) = self.race.youth_age_limit {
            rules.youth_age_limit = limit;
        }

        let policy = match &self.policy {
            PolicySection::Standard { tables } => {
                ScoringPolicy::Standard(StandardPolicy::new(tables.clone()))
            }
            PolicySection::OrderedRoster {
                roster,
                bonus_size,
                scoring_size,
                tables,
            } => {
                let order = roster
                    .iter()
                    .map(|name| {
                        registry
                            .id_of(name)
                            .ok_or_else(|| ConfigError::UnknownRider(name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ScoringPolicy::OrderedRoster(OrderedRosterPolicy::new(
                    order,
                    *bonus_size,
                    *scoring_size,
                    tables.clone(),
                )?)
            }
        };

        Ok(RaceSetup::new(registry, stages)
            .with_tiers(tiers)
            .with_rules(rules)
            .with_policy(policy)?)
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        let mut config = SamplerConfig::new(self.sampler.num_simulations);
        config.master_seed = self.race.seed;
        config.per_stage = self.sampler.per_stage;
        if let Some(threads) = self.sampler.threads {
            config.threads = threads;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tourlab_core::{RiderId, ScoreStage, Tier};

    const MINIMAL: &str = r#"
[[riders]]
name = "Sprinter"
team = "Fast"
age = 24
price = 3.0
abilities = { sprint = 96, punch = 60 }

[[riders]]
name = "Climber"
team = "High"
age = 29
price = 4.5
abandon_probability = 0.1
abilities = { mountain = 94, itt = 70 }
"#;

    #[test]
    fn minimal_file_uses_defaults() {
        let file = RaceFile::from_toml_str(MINIMAL).unwrap();
        assert_eq!(file.race.seed, 42);
        assert_eq!(file.optimizer, OptimizerConfig::default());
        let setup = file.build_setup().unwrap();
        assert_eq!(setup.stages().len(), 21);
        assert_eq!(setup.registry().get(RiderId(0)).abilities.mountain, 0);
        assert!(setup.policy().has_final_awards());
    }

    #[test]
    fn full_file_applies_every_section() {
        let content = format!(
            r#"
[race]
seed = 7
youth_age_limit = 26

[policy]
kind = "ordered_roster"
roster = ["Climber", "Sprinter"]
bonus_size = 1
scoring_size = 2

[optimizer]
budget = 10.0
team_size = 2
lineup_size_regular = 1
lineup_size_final = 2

[sampler]
num_simulations = 50
threads = 1
per_stage = false

[tiers.exceptional]
min = 1.0
mode = 2.0
max = 5.0

[[stages]]
number = 1
weights = {{ sprint = 0.7, punch = 0.3 }}

[[stages]]
number = 2
sprint_category = "category_three"
weights = {{ mountain = 1.0 }}
{MINIMAL}"#
        );
        let file = RaceFile::from_toml_str(&content).unwrap();
        let setup = file.build_setup().unwrap();
        assert_eq!(setup.stages().len(), 2);
        assert_eq!(setup.rules().youth_age_limit, 26);
        assert_eq!(setup.tiers().get(Tier::Exceptional).mode, 2.0);
        assert!(matches!(setup.policy(), ScoringPolicy::OrderedRoster(_)));
        assert_eq!(setup.ledger_stage_count(), 2);

        let sampler = file.sampler_config();
        assert_eq!(sampler.master_seed, 7);
        assert_eq!(sampler.threads, 1);
        assert!(!sampler.per_stage);
    }

    #[test]
    fn unknown_roster_rider_rejected() {
        let content = format!(
            "[policy]\nkind = \"ordered_roster\"\nroster = [\"Nobody\", \"Sprinter\"]\nbonus_size = 1\nscoring_size = 2\n{MINIMAL}"
        );
        let file = RaceFile::from_toml_str(&content).unwrap();
        assert!(matches!(
            file.build_setup(),
            Err(RaceFileError::Config(ConfigError::UnknownRider(_)))
        ));
    }

    #[test]
    fn bad_weights_rejected() {
        let content = format!("[[stages]]\nnumber = 1\nweights = {{ sprint = 0.5 }}\n{MINIMAL}");
        let file = RaceFile::from_toml_str(&content).unwrap();
        assert!(matches!(
            file.build_setup(),
            Err(RaceFileError::Config(ConfigError::WeightsDoNotSumToOne { .. }))
        ));
    }

    #[test]
    fn bad_point_tables_rejected() {
        let content = format!(
            "[policy]\nkind = \"standard\"\n\n[policy.tables]\nstage_finish = []\n{MINIMAL}"
        );
        let file = RaceFile::from_toml_str(&content).unwrap();
        assert!(matches!(
            file.build_setup(),
            Err(RaceFileError::Config(ConfigError::InvalidPointTable { .. }))
        ));

        let content = format!(
            "[policy]\nkind = \"ordered_roster\"\nroster = [\"Climber\", \"Sprinter\"]\nbonus_size = 1\nscoring_size = 2\n\n[policy.tables]\nbonus_cutoff = 0\n{MINIMAL}"
        );
        let file = RaceFile::from_toml_str(&content).unwrap();
        assert!(matches!(
            file.build_setup(),
            Err(RaceFileError::Config(ConfigError::InvalidPointTable { .. }))
        ));
    }

    #[test]
    fn invalid_optimizer_knob_rejected_on_parse() {
        let content = format!("[optimizer]\nrisk_aversion = 3.0\n{MINIMAL}");
        assert!(matches!(
            RaceFile::from_toml_str(&content),
            Err(RaceFileError::Optimizer(_))
        ));
    }

    #[test]
    fn load_from_disk_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(MINIMAL.as_bytes())
            .unwrap();

        let file = RaceFile::load(&path).unwrap();
        let again = RaceFile::from_toml_str(&file.to_toml_string().unwrap()).unwrap();
        assert_eq!(file, again);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RaceFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
