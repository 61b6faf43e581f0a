//! Domain types: disciplines, riders, clubs, stage profiles.

pub mod club;
pub mod discipline;
pub mod rider;
pub mod stage;

pub use club::ClubIndex;
pub use discipline::Discipline;
pub use rider::{Abilities, Rider, RiderId, RiderRegistry};
pub use stage::{SprintCategory, StageProfile, StageTable, WEIGHT_TOLERANCE};
