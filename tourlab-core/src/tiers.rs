//! Ability-to-outcome model.
//!
//! - `Tier`: contiguous ability-score bands.
//! - `RankDistribution`: triangular `(min, mode, max)` over finishing rank.
//! - `TierTable`: tier → distribution parameters, validated, passed in explicitly.
//! - `AbilityModel`: blends per-discipline distributions with a stage's weights.

use rand_distr::Triangular;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::{Abilities, StageProfile};
use crate::error::ConfigError;

// ─── Tiers ───────────────────────────────────────────────────────────

/// Ability band. Rank 1 is the best finish, so stronger tiers have lower,
/// tighter distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Exceptional,
    WorldClass,
    Elite,
    VeryGood,
    Good,
    Average,
    BelowAverage,
}

impl Tier {
    pub const ALL: [Tier; 7] = [
        Tier::Exceptional,
        Tier::WorldClass,
        Tier::Elite,
        Tier::VeryGood,
        Tier::Good,
        Tier::Average,
        Tier::BelowAverage,
    ];

    /// Lowest score that falls in this tier.
    pub fn lower_bound(self) -> u32 {
        match self {
            Tier::Exceptional => 98,
            Tier::WorldClass => 95,
            Tier::Elite => 90,
            Tier::VeryGood => 80,
            Tier::Good => 70,
            Tier::Average => 50,
            Tier::BelowAverage => 0,
        }
    }

    pub fn from_score(score: u32) -> Self {
        Tier::ALL
            .into_iter()
            .find(|t| score >= t.lower_bound())
            .unwrap_or(Tier::BelowAverage)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Exceptional => "exceptional",
            Tier::WorldClass => "world_class",
            Tier::Elite => "elite",
            Tier::VeryGood => "very_good",
            Tier::Good => "good",
            Tier::Average => "average",
            Tier::BelowAverage => "below_average",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Tier::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or_else(|| ConfigError::UnknownTier(s.to_string()))
    }
}

// ─── Distribution parameters ─────────────────────────────────────────

/// Triangular distribution over finishing rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankDistribution {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl RankDistribution {
    pub const fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.mode.is_finite()
            && self.max.is_finite()
            && self.min >= 1.0
            && self.min <= self.mode
            && self.mode <= self.max
    }

    pub fn to_triangular(&self) -> Result<Triangular<f64>, ConfigError> {
        Triangular::new(self.min, self.max, self.mode).map_err(|_| {
            ConfigError::InvalidTierParameters {
                tier: "blended".into(),
                min: self.min,
                mode: self.mode,
                max: self.max,
            }
        })
    }
}

/// Tier → rank distribution. Always complete: every tier has an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TierTable {
    entries: BTreeMap<Tier, RankDistribution>,
}

impl Default for TierTable {
    fn default() -> Self {
        let entries = [
            (Tier::Exceptional, RankDistribution::new(1.0, 1.0, 10.0)),
            (Tier::WorldClass, RankDistribution::new(1.0, 3.0, 20.0)),
            (Tier::Elite, RankDistribution::new(1.0, 6.0, 30.0)),
            (Tier::VeryGood, RankDistribution::new(1.0, 15.0, 40.0)),
            (Tier::Good, RankDistribution::new(5.0, 20.0, 50.0)),
            (Tier::Average, RankDistribution::new(20.0, 30.0, 60.0)),
            (Tier::BelowAverage, RankDistribution::new(50.0, 75.0, 150.0)),
        ]
        .into_iter()
        .collect();
        Self { entries }
    }
}

impl TierTable {
    /// Replace one tier's parameters.
    pub fn set(&mut self, tier: Tier, dist: RankDistribution) -> Result<(), ConfigError> {
        if !dist.is_valid() {
            return Err(ConfigError::InvalidTierParameters {
                tier: tier.to_string(),
                min: dist.min,
                mode: dist.mode,
                max: dist.max,
            });
        }
        self.entries.insert(tier, dist);
        Ok(())
    }

    /// Apply `{tierName → {min, mode, max}}` overrides on top of this table.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<String, RankDistribution>,
    ) -> Result<Self, ConfigError> {
        for (name, dist) in overrides {
            let tier: Tier = name.parse()?;
            self.set(tier, *dist)?;
        }
        Ok(self)
    }

    pub fn get(&self, tier: Tier) -> RankDistribution {
        self.entries[&tier]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, RankDistribution)> + '_ {
        self.entries.iter().map(|(t, d)| (*t, *d))
    }
}

// ─── Model ───────────────────────────────────────────────────────────

/// Maps ability scores to finishing-rank distributions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityModel {
    tiers: TierTable,
}

impl AbilityModel {
    pub fn new(tiers: TierTable) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn distribution_for(&self, score: u32) -> RankDistribution {
        self.tiers.get(Tier::from_score(score))
    }

    /// Component-wise weighted average of each discipline's tier triple.
    ///
    /// Weights come straight from the profile; a profile only exists if they
    /// were validated to sum to 1.
    pub fn blend(&self, abilities: &Abilities, profile: &StageProfile) -> RankDistribution {
        let mut out = RankDistribution::new(0.0, 0.0, 0.0);
        for (discipline, weight) in profile.weights() {
            let d = self.distribution_for(abilities.get(discipline));
            out.min += d.min * weight;
            out.mode += d.mode * weight;
            out.max += d.max * weight;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Discipline, SprintCategory};

    const EPS: f64 = 1e-9;

    #[test]
    fn score_bands() {
        assert_eq!(Tier::from_score(100), Tier::Exceptional);
        assert_eq!(Tier::from_score(98), Tier::Exceptional);
        assert_eq!(Tier::from_score(97), Tier::WorldClass);
        assert_eq!(Tier::from_score(95), Tier::WorldClass);
        assert_eq!(Tier::from_score(90), Tier::Elite);
        assert_eq!(Tier::from_score(89), Tier::VeryGood);
        assert_eq!(Tier::from_score(70), Tier::Good);
        assert_eq!(Tier::from_score(50), Tier::Average);
        assert_eq!(Tier::from_score(49), Tier::BelowAverage);
        assert_eq!(Tier::from_score(0), Tier::BelowAverage);
    }

    #[test]
    fn blend_is_weighted_sum_of_tier_triples() {
        let model = AbilityModel::default();
        let profile = StageProfile::new(
            1,
            [(Discipline::Sprint, 0.6), (Discipline::Punch, 0.4)],
            SprintCategory::CategoryOne,
        )
        .unwrap();
        let abilities = Abilities {
            sprint: 95,
            punch: 80,
            ..Abilities::default()
        };

        let d = model.blend(&abilities, &profile);
        // world_class (1, 3, 20) * 0.6 + very_good (1, 15, 40) * 0.4
        assert!((d.min - 1.0).abs() < EPS);
        assert!((d.mode - 7.8).abs() < EPS);
        assert!((d.max - 28.0).abs() < EPS);
    }

    #[test]
    fn absent_disciplines_contribute_nothing() {
        let model = AbilityModel::default();
        let profile =
            StageProfile::new(1, [(Discipline::Mountain, 1.0)], SprintCategory::CategoryThree)
                .unwrap();
        let mut abilities = Abilities::uniform(10);
        abilities.mountain = 99;
        assert_eq!(model.blend(&abilities, &profile), model.distribution_for(99));
    }

    #[test]
    fn overrides_replace_entries() {
        let mut overrides = BTreeMap::new();
        overrides.insert("elite".to_string(), RankDistribution::new(2.0, 4.0, 12.0));
        let table = TierTable::default().with_overrides(&overrides).unwrap();
        assert_eq!(table.get(Tier::Elite), RankDistribution::new(2.0, 4.0, 12.0));
        assert_eq!(table.get(Tier::Good), TierTable::default().get(Tier::Good));
    }

    #[test]
    fn unknown_tier_name_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("legendary".to_string(), RankDistribution::new(1.0, 1.0, 2.0));
        assert_eq!(
            TierTable::default().with_overrides(&overrides).unwrap_err(),
            ConfigError::UnknownTier("legendary".into())
        );
    }

    #[test]
    fn inverted_triple_rejected() {
        let mut table = TierTable::default();
        let err = table
            .set(Tier::Good, RankDistribution::new(10.0, 5.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTierParameters { .. }));
    }

    #[test]
    fn default_triples_build_distributions() {
        for (_, d) in TierTable::default().iter() {
            assert!(d.to_triangular().is_ok());
        }
    }
}
