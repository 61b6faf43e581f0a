use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Discipline;
use crate::error::ConfigError;

/// Allowed distance of a stage's weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-3;

/// Intermediate-sprint category of a stage. Selects the sprint-classification
/// point table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintCategory {
    /// Flat finish: the longest, richest table.
    CategoryOne,
    /// Hilly finish.
    CategoryTwo,
    /// Mountain finish or time trial.
    CategoryThree,
}

impl SprintCategory {
    /// Category a stage gets when none is given explicitly.
    pub fn for_primary(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Sprint => SprintCategory::CategoryOne,
            Discipline::Punch | Discipline::Breakaway => SprintCategory::CategoryTwo,
            Discipline::Mountain | Discipline::TimeTrial => SprintCategory::CategoryThree,
        }
    }
}

/// One stage: its number and its discipline mixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageProfile {
    number: u32,
    weights: BTreeMap<Discipline, f64>,
    sprint_category: SprintCategory,
}

impl StageProfile {
    /// Build a stage from `(discipline, weight)` pairs. Zero weights are dropped;
    /// repeated disciplines are summed.
    pub fn new<I>(
        number: u32,
        weights: I,
        sprint_category: SprintCategory,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Discipline, f64)>,
    {
        let mut map = BTreeMap::new();
        for (discipline, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    stage: number,
                    discipline: discipline.to_string(),
                    weight,
                });
            }
            if weight > 0.0 {
                *map.entry(discipline).or_insert(0.0) += weight;
            }
        }
        let sum: f64 = map.values().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { stage: number, sum });
        }
        Ok(Self {
            number,
            weights: map,
            sprint_category,
        })
    }

    /// Like [`StageProfile::new`], with the sprint category derived from the
    /// heaviest discipline.
    pub fn with_derived_category<I>(number: u32, weights: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Discipline, f64)>,
    {
        let mut profile = Self::new(number, weights, SprintCategory::CategoryOne)?;
        profile.sprint_category = SprintCategory::for_primary(profile.primary());
        Ok(profile)
    }

    /// Parse weights keyed by discipline name.
    pub fn from_named(
        number: u32,
        weights: &BTreeMap<String, f64>,
        sprint_category: Option<SprintCategory>,
    ) -> Result<Self, ConfigError> {
        let parsed = weights
            .iter()
            .map(|(k, v)| Ok((k.parse::<Discipline>()?, *v)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        match sprint_category {
            Some(category) => Self::new(number, parsed, category),
            None => Self::with_derived_category(number, parsed),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn sprint_category(&self) -> SprintCategory {
        self.sprint_category
    }

    /// Weight of `discipline` in this stage (0 when absent).
    pub fn weight(&self, discipline: Discipline) -> f64 {
        self.weights.get(&discipline).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> impl Iterator<Item = (Discipline, f64)> + '_ {
        self.weights.iter().map(|(d, w)| (*d, *w))
    }

    /// Heaviest discipline; ties go to the earlier one in [`Discipline::ALL`].
    pub fn primary(&self) -> Discipline {
        let mut best = Discipline::Sprint;
        let mut best_w = f64::NEG_INFINITY;
        for d in Discipline::ALL {
            let w = self.weight(d);
            if w > best_w {
                best = d;
                best_w = w;
            }
        }
        best
    }
}

/// Ordered stage profiles, numbered `1..=S` without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StageTable {
    stages: Vec<StageProfile>,
}

impl StageTable {
    pub fn new(mut stages: Vec<StageProfile>) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        stages.sort_by_key(|s| s.number);
        let expected_last = stages.len();
        for (i, stage) in stages.iter().enumerate() {
            if stage.number as usize != i + 1 {
                return Err(ConfigError::NonContiguousStages {
                    position: i,
                    found: stage.number,
                    expected_last,
                });
            }
        }
        Ok(Self { stages })
    }

    /// Number of racing stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[StageProfile] {
        &self.stages
    }

    pub fn get(&self, number: u32) -> Option<&StageProfile> {
        (number as usize)
            .checked_sub(1)
            .and_then(|i| self.stages.get(i))
    }

    pub fn last_number(&self) -> u32 {
        self.stages.len() as u32
    }

    /// The 21 stages of the 2025 Tour de France.
    pub fn tour_2025() -> Self {
        use Discipline::*;
        use SprintCategory::*;

        let raw: [(&[(Discipline, f64)], SprintCategory); 21] = [
            (&[(Sprint, 1.0)], CategoryOne),
            (&[(Punch, 0.8), (Sprint, 0.2)], CategoryTwo),
            (&[(Sprint, 1.0)], CategoryOne),
            (&[(Punch, 0.7), (Sprint, 0.3)], CategoryTwo),
            (&[(TimeTrial, 1.0)], CategoryThree),
            (&[(Punch, 0.6), (Breakaway, 0.3), (Mountain, 0.1)], CategoryTwo),
            (&[(Punch, 0.7), (Mountain, 0.3)], CategoryTwo),
            (&[(Sprint, 0.9), (Punch, 0.1)], CategoryOne),
            (&[(Sprint, 1.0)], CategoryOne),
            (&[(Mountain, 0.5), (Breakaway, 0.5)], CategoryThree),
            (&[(Breakaway, 0.2), (Sprint, 0.2), (Punch, 0.6)], CategoryTwo),
            (&[(Mountain, 1.0)], CategoryThree),
            (&[(TimeTrial, 0.2), (Mountain, 0.8)], CategoryThree),
            (&[(Mountain, 0.8), (Breakaway, 0.2)], CategoryThree),
            (&[(Breakaway, 0.8), (Sprint, 0.2)], CategoryTwo),
            (&[(Mountain, 1.0)], CategoryThree),
            (&[(Breakaway, 0.4), (Sprint, 0.6)], CategoryOne),
            (&[(Mountain, 1.0)], CategoryThree),
            (&[(Mountain, 1.0)], CategoryThree),
            (&[(Breakaway, 0.8), (Sprint, 0.2)], CategoryTwo),
            (&[(Sprint, 0.6), (Punch, 0.4)], CategoryOne),
        ];

        let stages = raw
            .iter()
            .enumerate()
            .map(|(i, (weights, category))| StageProfile {
                number: i as u32 + 1,
                weights: weights.iter().copied().collect(),
                sprint_category: *category,
            })
            .collect();
        Self { stages }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self::tour_2025()
    }
}
