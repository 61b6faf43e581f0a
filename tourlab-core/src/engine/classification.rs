//! Classification engine: general (time), sprint (points), mountain (points)
//! and youth (time, age-restricted).
//!
//! Standings list active riders only. Time classifications sort ascending,
//! points classifications descending, ties fall back to rider order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::stage::Placing;
use super::state::SimulationState;
use crate::domain::{RiderId, StageProfile};
use crate::rules::ClassificationRules;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub rider: RiderId,
    /// Seconds behind a virtual zero.
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub rider: RiderId,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub gc: Vec<TimeEntry>,
    pub sprint: Vec<PointsEntry>,
    pub mountain: Vec<PointsEntry>,
    pub youth: Vec<TimeEntry>,
}

impl Standings {
    pub fn gc_leader(&self) -> Option<RiderId> {
        self.gc.first().map(|e| e.rider)
    }

    pub fn youth_leader(&self) -> Option<RiderId> {
        self.youth.first().map(|e| e.rider)
    }

    /// Sprint leader; nobody leads on zero points.
    pub fn sprint_leader(&self) -> Option<RiderId> {
        self.sprint.first().filter(|e| e.points > 0).map(|e| e.rider)
    }

    pub fn mountain_leader(&self) -> Option<RiderId> {
        self.mountain.first().filter(|e| e.points > 0).map(|e| e.rider)
    }
}

// ── Updates ──────────────────────────────────────────────────────────

/// Apply one stage's result to the cumulative classifications.
pub(crate) fn apply_stage(
    state: &mut SimulationState,
    rules: &ClassificationRules,
    profile: &StageProfile,
    placings: &[Placing],
    time_gap: f64,
    youth: &[bool],
) {
    let category = profile.sprint_category();
    let mountain_depth = rules.mountain_depth();

    for (place, p) in placings.iter().enumerate() {
        let i = p.rider.0;
        let lost = time_gap * place as f64;
        state.gc_time[i] += lost;
        if youth[i] {
            state.youth_time[i] += lost;
        }

        state.sprint_points[i] += rules.sprint_points(category, place);
        if place < mountain_depth {
            state.mountain_points[i] += rules.mountain_points(profile, place);
        }
    }
}

/// Current standings, recomputed from the cumulative state.
pub fn standings(state: &SimulationState, youth: &[bool]) -> Standings {
    let active: Vec<RiderId> = (0..state.rider_count())
        .map(RiderId)
        .filter(|&r| state.is_active(r))
        .collect();

    let mut gc: Vec<TimeEntry> = active
        .iter()
        .map(|&rider| TimeEntry {
            rider,
            time: state.gc_time(rider),
        })
        .collect();
    sort_by_time(&mut gc);

    let mut youth_entries: Vec<TimeEntry> = active
        .iter()
        .filter(|r| youth[r.0])
        .map(|&rider| TimeEntry {
            rider,
            time: state.youth_time(rider),
        })
        .collect();
    sort_by_time(&mut youth_entries);

    let mut sprint: Vec<PointsEntry> = active
        .iter()
        .map(|&rider| PointsEntry {
            rider,
            points: state.sprint_points(rider),
        })
        .collect();
    sort_by_points(&mut sprint);

    let mut mountain: Vec<PointsEntry> = active
        .iter()
        .map(|&rider| PointsEntry {
            rider,
            points: state.mountain_points(rider),
        })
        .collect();
    sort_by_points(&mut mountain);

    Standings {
        gc,
        sprint,
        mountain,
        youth: youth_entries,
    }
}

fn sort_by_time(entries: &mut [TimeEntry]) {
    entries.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(Ordering::Equal)
            .then(a.rider.cmp(&b.rider))
    });
}

fn sort_by_points(entries: &mut [PointsEntry]) {
    entries.sort_by(|a, b| b.points.cmp(&a.points).then(a.rider.cmp(&b.rider)));
}
