pub mod action;
pub mod day_set;
pub mod instant;

pub use action::{ButtonAction, Capability, DesiredState};
pub use day_set::DaySet;
pub use instant::ResolvedTime;
