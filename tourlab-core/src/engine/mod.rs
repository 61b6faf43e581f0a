//! Race engine: precomputed distributions, per-run state, stage draws,
//! abandonment, classifications and the tour loop.

pub mod abandonment;
pub mod classification;
pub mod precompute;
pub mod stage;
pub mod state;
pub mod tour;

pub use abandonment::{per_stage_probability, AbandonmentCause, AbandonmentEvent};
pub use classification::{PointsEntry, Standings, TimeEntry};
pub use precompute::PrecomputedField;
pub use stage::Placing;
pub use state::{LedgerSnapshot, SimulationState, StageReport};
pub use tour::{TourResult, TourSimulator};
