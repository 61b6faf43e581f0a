//! Ordered-roster game.
//!
//! The roster order carries meaning: the first `bonus_size` active positions
//! earn a position bonus for a top-10 finish, the first `scoring_size` active
//! positions score stage points, the rest wait as reserves. When a scorer
//! abandons, everyone behind moves up one place, so the first reserve is
//! promoted without disturbing the relative order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use super::{
    check_non_increasing, check_table, invalid_table, table_points, ScoreStage, StageContext,
};
use crate::domain::RiderId;
use crate::engine::state::SimulationState;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedTables {
    pub regular: Vec<u32>,
    pub special: Vec<u32>,
    /// Stage numbers that use the `special` table.
    pub special_stages: BTreeSet<u32>,
    /// Bonus by active roster position (0-based) for a top-`bonus_cutoff` finish.
    pub position_bonus: Vec<u32>,
    pub bonus_cutoff: u32,
}

impl Default for OrderedTables {
    fn default() -> Self {
        Self {
            regular: vec![20, 15, 12, 9, 7, 5, 4, 3, 2, 1],
            special: vec![30, 20, 15, 12, 10, 8, 6, 4, 2, 1],
            special_stages: [5, 13, 14, 17, 18].into_iter().collect(),
            position_bonus: vec![5, 4, 3, 2, 1],
            bonus_cutoff: 10,
        }
    }
}

impl OrderedTables {
    pub fn for_stage(&self, stage: u32) -> &[u32] {
        if self.special_stages.contains(&stage) {
            &self.special
        } else {
            &self.regular
        }
    }

    /// Finish tables must be usable and every bonus position must pay.
    pub fn validate(&self, bonus_size: usize) -> Result<(), ConfigError> {
        check_table("regular", &self.regular)?;
        check_table("special", &self.special)?;
        if self.bonus_cutoff == 0 {
            return Err(invalid_table("bonus_cutoff", "must be at least 1"));
        }
        if self.position_bonus.len() < bonus_size {
            return Err(invalid_table(
                "position_bonus",
                format!(
                    "{} entries for {bonus_size} bonus positions",
                    self.position_bonus.len()
                ),
            ));
        }
        check_non_increasing("position_bonus", &self.position_bonus)
    }
}

/// One reserve moving into the scoring positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Stage at which the change takes effect.
    pub stage: u32,
    pub abandoned: RiderId,
    /// 1-based roster position the abandoned rider held in the original order.
    pub position: usize,
    /// `None` once the reserves are exhausted.
    pub promoted: Option<RiderId>,
}

/// Deterministic position machine for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterState {
    order: Vec<RiderId>,
    bonus_size: usize,
    scoring_size: usize,
    scoring: Vec<RiderId>,
    promotions: Vec<Promotion>,
}

impl RosterState {
    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.scoring.clear();
        self.promotions.clear();
        self.bonus_size = 0;
        self.scoring_size = 0;
    }

    /// Start a run with every rider active.
    pub fn start(&mut self, order: &[RiderId], bonus_size: usize, scoring_size: usize) {
        self.clear();
        self.order.extend_from_slice(order);
        self.bonus_size = bonus_size;
        self.scoring_size = scoring_size;
        self.scoring
            .extend(order.iter().copied().take(scoring_size));
    }

    /// Recompute scorers as the first `scoring_size` active riders in roster
    /// order, logging one promotion per scorer lost since the last refresh.
    pub fn refresh<F>(&mut self, stage: u32, is_active: F)
    where
        F: Fn(RiderId) -> bool,
    {
        if self.scoring.iter().all(|&r| is_active(r)) {
            return;
        }
        let previous = std::mem::take(&mut self.scoring);
        self.scoring.extend(
            self.order
                .iter()
                .copied()
                .filter(|&r| is_active(r))
                .take(self.scoring_size),
        );

        let mut newcomers = self.scoring.iter().filter(|r| !previous.contains(r));
        for &lost in previous.iter().filter(|&&r| !is_active(r)) {
            let position = self
                .order
                .iter()
                .position(|&r| r == lost)
                .map_or(0, |i| i + 1);
            self.promotions.push(Promotion {
                stage,
                abandoned: lost,
                position,
                promoted: newcomers.next().copied(),
            });
        }
    }

    /// Riders currently in the scoring positions, in order.
    pub fn scoring(&self) -> &[RiderId] {
        &self.scoring
    }

    /// 0-based scoring position of `rider`, if they are scoring.
    pub fn scoring_position(&self, rider: RiderId) -> Option<usize> {
        self.scoring.iter().position(|&r| r == rider)
    }

    pub fn bonus_size(&self) -> usize {
        self.bonus_size
    }

    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedRosterPolicy {
    /// `None` scores the whole field on finish position alone, with no
    /// position bonus. Used to estimate per-rider value before a roster exists.
    roster: Option<Vec<RiderId>>,
    bonus_size: usize,
    scoring_size: usize,
    tables: OrderedTables,
}

impl OrderedRosterPolicy {
    pub const DEFAULT_BONUS_SIZE: usize = 5;
    pub const DEFAULT_SCORING_SIZE: usize = 15;

    pub fn new(
        roster: Vec<RiderId>,
        bonus_size: usize,
        scoring_size: usize,
        tables: OrderedTables,
    ) -> Result<Self, ConfigError> {
        if bonus_size >= scoring_size {
            return Err(ConfigError::InvalidRoster(format!(
                "bonus positions ({bonus_size}) must be fewer than scoring positions ({scoring_size})"
            )));
        }
        if scoring_size > roster.len() {
            return Err(ConfigError::InvalidRoster(format!(
                "{scoring_size} scoring positions but only {} riders",
                roster.len()
            )));
        }
        tables.validate(bonus_size)?;
        let mut seen = HashSet::with_capacity(roster.len());
        if let Some(dup) = roster.iter().find(|r| !seen.insert(**r)) {
            return Err(ConfigError::InvalidRoster(format!("rider {dup} listed twice")));
        }
        Ok(Self {
            roster: Some(roster),
            bonus_size,
            scoring_size,
            tables,
        })
    }

    pub fn open_field(tables: OrderedTables) -> Self {
        Self {
            roster: None,
            bonus_size: 0,
            scoring_size: 0,
            tables,
        }
    }

    pub fn roster(&self) -> Option<&[RiderId]> {
        self.roster.as_deref()
    }

    pub fn bonus_size(&self) -> usize {
        self.bonus_size
    }

    pub fn scoring_size(&self) -> usize {
        self.scoring_size
    }

    pub fn tables(&self) -> &OrderedTables {
        &self.tables
    }
}

impl ScoreStage for OrderedRosterPolicy {
    fn prepare(&self, state: &mut SimulationState) {
        if let Some(order) = &self.roster {
            state
                .roster
                .start(order, self.bonus_size, self.scoring_size);
        }
    }

    fn score_stage(&self, ctx: &StageContext<'_>, state: &mut SimulationState) {
        let stage = ctx.profile.number();
        let table = self.tables.for_stage(stage);

        if self.roster.is_none() {
            for (place, p) in ctx.placings.iter().take(table.len()).enumerate() {
                state.award(p.rider, table_points(table, place));
            }
            return;
        }

        state.refresh_roster(stage);
        let depth = table.len().max(self.tables.bonus_cutoff as usize);
        for (place, p) in ctx.placings.iter().take(depth).enumerate() {
            let Some(position) = state.roster.scoring_position(p.rider) else {
                continue;
            };
            let mut points = table_points(table, place);
            if position < self.bonus_size && p.rank <= self.tables.bonus_cutoff {
                points += table_points(&self.tables.position_bonus, position);
            }
            state.award(p.rider, points);
        }
    }
}
