pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod logging;
pub mod restore;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ConfigLoader, EngineConfig, SwitchExpectation};
pub use engine::{EngineParams, ScheduleEngine};
pub use error::{EngineError, Result};
pub use gate::{GateDecision, SkipReason};
pub use gateway::{CommandGateway, ModeSource, SwitchSource};
pub use restore::{RestoreAction, LOOKBACK_DAYS};
