pub mod compile;
pub mod dual;
pub mod error;
pub mod model;
pub mod providers;
pub mod resolve;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use compile::{compile, RecurringTrigger};
pub use dual::{select, Selection};
pub use error::{Result, ScheduleError};
pub use model::{Device, Schedule, SelectionPolicy, TimeSpec};
pub use providers::{ResolveContext, SolarProvider, SolarTimes, VariableStore};
pub use resolve::{resolve, Resolution, UnresolvedReason};
pub use store::ScheduleStore;
