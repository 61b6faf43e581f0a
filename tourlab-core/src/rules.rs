//! Classification rules: pacing gaps, sprint and mountain point tables, youth
//! age limit. Serializable with defaults for every field so a race file only
//! has to name what it changes.

use serde::{Deserialize, Serialize};

use crate::domain::{Discipline, SprintCategory, StageProfile};

/// Seconds lost per place behind the stage winner, per discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingGaps {
    pub sprint: f64,
    pub punch: f64,
    pub itt: f64,
    pub mountain: f64,
    pub breakaway: f64,
}

impl Default for PacingGaps {
    fn default() -> Self {
        Self {
            sprint: 0.1,
            punch: 0.2,
            itt: 5.0,
            mountain: 20.0,
            breakaway: 1.0,
        }
    }
}

impl PacingGaps {
    pub fn get(&self, discipline: Discipline) -> f64 {
        match discipline {
            Discipline::Sprint => self.sprint,
            Discipline::Punch => self.punch,
            Discipline::TimeTrial => self.itt,
            Discipline::Mountain => self.mountain,
            Discipline::Breakaway => self.breakaway,
        }
    }
}

/// Sprint-classification points by finishing rank, per sprint category.
/// Flat stages pay deeper into the field than hilly or mountain stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintTables {
    pub category_one: Vec<u32>,
    pub category_two: Vec<u32>,
    pub category_three: Vec<u32>,
}

impl Default for SprintTables {
    fn default() -> Self {
        Self {
            category_one: vec![
                50, 30, 20, 18, 16, 14, 12, 10, 8, 7, 6, 5, 4, 3, 2, 2, 2, 1, 1, 1,
            ],
            category_two: vec![30, 25, 22, 19, 17, 15, 13, 11, 9, 7, 6, 5, 4, 3, 2],
            category_three: vec![20, 17, 15, 13, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1],
        }
    }
}

impl SprintTables {
    pub fn get(&self, category: SprintCategory) -> &[u32] {
        match category {
            SprintCategory::CategoryOne => &self.category_one,
            SprintCategory::CategoryTwo => &self.category_two,
            SprintCategory::CategoryThree => &self.category_three,
        }
    }
}

/// Mountain-classification tables. A stage blends them by its mountain,
/// breakaway and punch weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainTables {
    pub mountain: Vec<u32>,
    pub breakaway: Vec<u32>,
    pub punch: Vec<u32>,
}

impl Default for MountainTables {
    fn default() -> Self {
        Self {
            mountain: vec![50, 45, 40, 35, 30, 25, 20, 15, 10, 5],
            breakaway: vec![20, 18, 16, 14, 12, 10, 8, 6, 4, 2],
            punch: vec![10, 8, 7, 6, 5, 4, 3, 2, 1, 0],
        }
    }
}

/// Everything the classification engine needs beyond the stage table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub pacing: PacingGaps,
    /// Riders strictly younger than this are youth-eligible.
    pub youth_age_limit: u32,
    pub sprint: SprintTables,
    pub mountain: MountainTables,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            pacing: PacingGaps::default(),
            youth_age_limit: 25,
            sprint: SprintTables::default(),
            mountain: MountainTables::default(),
        }
    }
}

impl ClassificationRules {
    /// Seconds per place for this stage: the weighted blend of pacing gaps.
    pub fn stage_time_gap(&self, profile: &StageProfile) -> f64 {
        profile
            .weights()
            .map(|(d, w)| self.pacing.get(d) * w)
            .sum()
    }

    /// Sprint points for the rider at 0-based `place`.
    pub fn sprint_points(&self, category: SprintCategory, place: usize) -> u32 {
        self.sprint.get(category).get(place).copied().unwrap_or(0)
    }

    /// Mountain points for the rider at 0-based `place`: the weighted sum of
    /// the three tables, truncated once.
    pub fn mountain_points(&self, profile: &StageProfile, place: usize) -> u32 {
        let at = |table: &[u32]| table.get(place).copied().unwrap_or(0) as f64;
        let blended = at(&self.mountain.mountain) * profile.weight(Discipline::Mountain)
            + at(&self.mountain.breakaway) * profile.weight(Discipline::Breakaway)
            + at(&self.mountain.punch) * profile.weight(Discipline::Punch);
        // 1e-9 absorbs products like 45 * 0.8 landing just under an integer.
        (blended + 1e-9).floor() as u32
    }

    /// Rank positions that can earn mountain points.
    pub fn mountain_depth(&self) -> usize {
        self.mountain
            .mountain
            .len()
            .max(self.mountain.breakaway.len())
            .max(self.mountain.punch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(weights: &[(Discipline, f64)]) -> StageProfile {
        StageProfile::with_derived_category(1, weights.iter().copied()).unwrap()
    }

    #[test]
    fn time_gap_is_weighted() {
        let rules = ClassificationRules::default();
        let p = profile(&[(Discipline::Mountain, 0.5), (Discipline::Breakaway, 0.5)]);
        assert!((rules.stage_time_gap(&p) - 10.5).abs() < 1e-12);
    }

    #[test]
    fn mountain_points_blend_and_truncate() {
        let rules = ClassificationRules::default();
        // 0.8 * 45 + 0.2 * 18 = 39.6 -> 39
        let p = profile(&[(Discipline::Mountain, 0.8), (Discipline::Breakaway, 0.2)]);
        assert_eq!(rules.mountain_points(&p, 1), 39);
        // 0.8 * 45 exactly 36
        let p = profile(&[(Discipline::Mountain, 0.8), (Discipline::Sprint, 0.2)]);
        assert_eq!(rules.mountain_points(&p, 1), 36);
        // pure sprint stage awards nothing
        let p = profile(&[(Discipline::Sprint, 1.0)]);
        assert_eq!(rules.mountain_points(&p, 0), 0);
        // beyond the tables
        let p = profile(&[(Discipline::Mountain, 1.0)]);
        assert_eq!(rules.mountain_points(&p, 10), 0);
    }

    #[test]
    fn category_one_pays_most_and_deepest() {
        let rules = ClassificationRules::default();
        assert_eq!(rules.sprint_points(SprintCategory::CategoryOne, 0), 50);
        assert_eq!(rules.sprint_points(SprintCategory::CategoryTwo, 0), 30);
        assert_eq!(rules.sprint_points(SprintCategory::CategoryThree, 0), 20);

        let tables = &rules.sprint;
        assert!(tables.category_one.len() > tables.category_two.len());
        assert!(tables.category_one.len() > tables.category_three.len());

        // 16th place scores only on a flat stage
        assert!(rules.sprint_points(SprintCategory::CategoryOne, 15) > 0);
        assert_eq!(rules.sprint_points(SprintCategory::CategoryTwo, 15), 0);
        assert_eq!(rules.sprint_points(SprintCategory::CategoryThree, 15), 0);
        assert_eq!(rules.sprint_points(SprintCategory::CategoryOne, 20), 0);
    }

    #[test]
    fn sprint_tables_never_increase() {
        let tables = SprintTables::default();
        for category in [
            SprintCategory::CategoryOne,
            SprintCategory::CategoryTwo,
            SprintCategory::CategoryThree,
        ] {
            assert!(tables.get(category).windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
