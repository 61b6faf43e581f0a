//! Mutable per-run simulation state.
//!
//! One `SimulationState` is allocated per worker and [`SimulationState::reset`]
//! between runs; every buffer keeps its capacity.

use serde::{Deserialize, Serialize};

use super::abandonment::AbandonmentEvent;
use super::classification::Standings;
use super::stage::Placing;
use crate::domain::RiderId;
use crate::scoring::RosterState;

/// Everything recorded about one stage when reports are enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: u32,
    /// Riders who did not start this stage (abandoned before it).
    pub abandoned: Vec<RiderId>,
    pub placings: Vec<Placing>,
    /// Classification standings after this stage.
    pub standings: Standings,
}

/// Cumulative ledger after one ledger stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Racing stage number, or `S + 1` for end-of-race awards.
    pub stage: u32,
    pub cumulative: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub(crate) gc_time: Vec<f64>,
    pub(crate) youth_time: Vec<f64>,
    pub(crate) sprint_points: Vec<u32>,
    pub(crate) mountain_points: Vec<u32>,
    /// Stage number a rider failed to start; `None` while still racing.
    pub(crate) abandoned_at: Vec<Option<u32>>,
    pub(crate) abandonments: Vec<AbandonmentEvent>,
    pub(crate) ledger: Vec<u32>,
    pub(crate) ledger_log: Vec<LedgerSnapshot>,
    pub(crate) top10_finishes: Vec<u32>,
    pub(crate) roster: RosterState,
    pub(crate) reports: Option<Vec<StageReport>>,
    // scratch buffers reused across stages
    pub(crate) active_buf: Vec<RiderId>,
    pub(crate) placings_buf: Vec<Placing>,
}

impl SimulationState {
    /// Fresh state for `riders` riders. `record_reports` keeps per-stage
    /// placings and standings; the sampler leaves it off.
    pub fn new(riders: usize, record_reports: bool) -> Self {
        Self {
            gc_time: vec![0.0; riders],
            youth_time: vec![0.0; riders],
            sprint_points: vec![0; riders],
            mountain_points: vec![0; riders],
            abandoned_at: vec![None; riders],
            abandonments: Vec::new(),
            ledger: vec![0; riders],
            ledger_log: Vec::new(),
            top10_finishes: vec![0; riders],
            roster: RosterState::default(),
            reports: record_reports.then(Vec::new),
            active_buf: Vec::with_capacity(riders),
            placings_buf: Vec::with_capacity(riders),
        }
    }

    /// Clear all per-run data.
    pub fn reset(&mut self) {
        self.gc_time.fill(0.0);
        self.youth_time.fill(0.0);
        self.sprint_points.fill(0);
        self.mountain_points.fill(0);
        self.abandoned_at.fill(None);
        self.abandonments.clear();
        self.ledger.fill(0);
        self.ledger_log.clear();
        self.top10_finishes.fill(0);
        self.roster.clear();
        if let Some(reports) = self.reports.as_mut() {
            reports.clear();
        }
    }

    pub fn rider_count(&self) -> usize {
        self.ledger.len()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self, rider: RiderId) -> bool {
        self.abandoned_at[rider.0].is_none()
    }

    pub fn abandoned_at(&self, rider: RiderId) -> Option<u32> {
        self.abandoned_at[rider.0]
    }

    pub fn abandonments(&self) -> &[AbandonmentEvent] {
        &self.abandonments
    }

    pub fn gc_time(&self, rider: RiderId) -> f64 {
        self.gc_time[rider.0]
    }

    pub fn youth_time(&self, rider: RiderId) -> f64 {
        self.youth_time[rider.0]
    }

    pub fn sprint_points(&self, rider: RiderId) -> u32 {
        self.sprint_points[rider.0]
    }

    pub fn mountain_points(&self, rider: RiderId) -> u32 {
        self.mountain_points[rider.0]
    }

    /// Cumulative fantasy points per rider.
    pub fn ledger(&self) -> &[u32] {
        &self.ledger
    }

    pub fn ledger_log(&self) -> &[LedgerSnapshot] {
        &self.ledger_log
    }

    pub fn top10_finishes(&self) -> &[u32] {
        &self.top10_finishes
    }

    pub fn roster(&self) -> &RosterState {
        &self.roster
    }

    pub fn reports(&self) -> Option<&[StageReport]> {
        self.reports.as_deref()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Mark `rider` as not starting `stage` or anything after. No-op for a
    /// rider already out.
    pub(crate) fn abandon(&mut self, event: AbandonmentEvent) {
        let slot = &mut self.abandoned_at[event.rider.0];
        if slot.is_none() {
            *slot = Some(event.stage);
            self.abandonments.push(event);
        }
    }

    pub(crate) fn award(&mut self, rider: RiderId, points: u32) {
        self.ledger[rider.0] += points;
    }

    /// Snapshot the cumulative ledger as ledger stage `stage`.
    pub(crate) fn close_ledger_stage(&mut self, stage: u32) {
        self.ledger_log.push(LedgerSnapshot {
            stage,
            cumulative: self.ledger.clone(),
        });
    }

    /// Re-derive the scoring positions of the ordered roster for `stage`.
    pub(crate) fn refresh_roster(&mut self, stage: u32) {
        let abandoned_at = &self.abandoned_at;
        self.roster
            .refresh(stage, |rider| abandoned_at[rider.0].is_none());
    }
}
