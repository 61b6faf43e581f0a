//! Standard game: stage finish points, daily leadership snapshots, teammate
//! bonuses, and end-of-race classification awards.

use serde::{Deserialize, Serialize};

use super::{award_teammates, check_table, table_points, FinalContext, ScoreStage, StageContext};
use crate::domain::ClubIndex;
use crate::engine::classification::{PointsEntry, Standings, TimeEntry};
use crate::engine::state::SimulationState;
use crate::error::ConfigError;

/// One flat value per classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationBonus {
    pub gc: u32,
    pub sprint: u32,
    pub mountain: u32,
    pub youth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardTables {
    pub stage_finish: Vec<u32>,
    pub gc_leadership: Vec<u32>,
    pub sprint_leadership: Vec<u32>,
    pub mountain_leadership: Vec<u32>,
    pub youth_leadership: Vec<u32>,
    /// Daily bonus for teammates of the stage winner.
    pub stage_winner_teammate: u32,
    /// Daily bonus for teammates of each classification leader.
    pub leader_teammate: ClassificationBonus,
    pub final_gc: Vec<u32>,
    pub final_sprint: Vec<u32>,
    pub final_mountain: Vec<u32>,
    pub final_youth: Vec<u32>,
    /// One-off bonus for teammates of each final classification winner.
    pub final_teammate: ClassificationBonus,
}

impl Default for StandardTables {
    fn default() -> Self {
        Self {
            stage_finish: vec![
                50, 44, 40, 36, 32, 30, 28, 26, 24, 22, 20, 18, 16, 14, 12, 10, 8, 6, 4, 2,
            ],
            gc_leadership: vec![15, 12, 9, 6, 3],
            sprint_leadership: vec![10, 8, 6],
            mountain_leadership: vec![10, 8, 6],
            youth_leadership: vec![6, 4, 2],
            stage_winner_teammate: 10,
            leader_teammate: ClassificationBonus {
                gc: 8,
                sprint: 6,
                mountain: 6,
                youth: 4,
            },
            final_gc: vec![
                100, 80, 60, 50, 40, 36, 32, 28, 24, 22, 20, 18, 16, 14, 12, 10, 8, 6, 4, 2,
            ],
            final_sprint: vec![80, 60, 40, 30, 20, 10, 8, 6, 4, 2],
            final_mountain: vec![80, 60, 40, 30, 20, 10, 8, 6, 4, 2],
            final_youth: vec![50, 30, 20, 10, 5],
            final_teammate: ClassificationBonus {
                gc: 24,
                sprint: 18,
                mountain: 18,
                youth: 9,
            },
        }
    }
}

impl StandardTables {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, table) in [
            ("stage_finish", &self.stage_finish),
            ("gc_leadership", &self.gc_leadership),
            ("sprint_leadership", &self.sprint_leadership),
            ("mountain_leadership", &self.mountain_leadership),
            ("youth_leadership", &self.youth_leadership),
            ("final_gc", &self.final_gc),
            ("final_sprint", &self.final_sprint),
            ("final_mountain", &self.final_mountain),
            ("final_youth", &self.final_youth),
        ] {
            check_table(name, table)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardPolicy {
    pub tables: StandardTables,
}

impl StandardPolicy {
    pub fn new(tables: StandardTables) -> Self {
        Self { tables }
    }

    /// Award `table` down a time classification and the top-of-table
    /// teammate bonus.
    fn award_time_table(
        state: &mut SimulationState,
        clubs: &ClubIndex,
        entries: &[TimeEntry],
        table: &[u32],
        teammate: u32,
    ) {
        for (place, e) in entries.iter().take(table.len()).enumerate() {
            state.award(e.rider, table_points(table, place));
        }
        if let Some(leader) = entries.first() {
            award_teammates(state, clubs, leader.rider, teammate);
        }
    }

    /// Same for a points classification, where only riders with points rank.
    fn award_points_table(
        state: &mut SimulationState,
        clubs: &ClubIndex,
        entries: &[PointsEntry],
        table: &[u32],
        teammate: u32,
    ) {
        let ranked = entries.iter().take_while(|e| e.points > 0);
        for (place, e) in ranked.take(table.len()).enumerate() {
            state.award(e.rider, table_points(table, place));
        }
        if let Some(leader) = entries.first().filter(|e| e.points > 0) {
            award_teammates(state, clubs, leader.rider, teammate);
        }
    }

    fn award_classifications(
        state: &mut SimulationState,
        clubs: &ClubIndex,
        standings: &Standings,
        tables: [&[u32]; 4],
        teammate: &ClassificationBonus,
    ) {
        let [gc, sprint, mountain, youth] = tables;
        Self::award_time_table(state, clubs, &standings.gc, gc, teammate.gc);
        Self::award_points_table(state, clubs, &standings.sprint, sprint, teammate.sprint);
        Self::award_points_table(state, clubs, &standings.mountain, mountain, teammate.mountain);
        Self::award_time_table(state, clubs, &standings.youth, youth, teammate.youth);
    }
}

impl ScoreStage for StandardPolicy {
    fn score_stage(&self, ctx: &StageContext<'_>, state: &mut SimulationState) {
        let t = &self.tables;
        for (place, p) in ctx.placings.iter().take(t.stage_finish.len()).enumerate() {
            state.award(p.rider, table_points(&t.stage_finish, place));
        }
        if let Some(winner) = ctx.placings.first() {
            award_teammates(state, ctx.clubs, winner.rider, t.stage_winner_teammate);
        }
        Self::award_classifications(
            state,
            ctx.clubs,
            ctx.standings,
            [
                &t.gc_leadership,
                &t.sprint_leadership,
                &t.mountain_leadership,
                &t.youth_leadership,
            ],
            &t.leader_teammate,
        );
    }

    fn has_final_awards(&self) -> bool {
        true
    }

    fn final_awards(&self, ctx: &FinalContext<'_>, state: &mut SimulationState) {
        let t = &self.tables;
        Self::award_classifications(
            state,
            ctx.clubs,
            ctx.standings,
            [&t.final_gc, &t.final_sprint, &t.final_mountain, &t.final_youth],
            &t.final_teammate,
        );
    }
}
