use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::sync::Mutex;

use helio_schedule::{SolarProvider, SolarTimes, VariableStore};
use helio_types::{ButtonAction, DesiredState};

use crate::gateway::{CommandGateway, ModeSource, SwitchSource};

/// 记录每次命令调用的测试网关
#[derive(Default)]
pub(crate) struct RecordingGateway {
    calls: Mutex<Vec<String>>,
    supported_actions: Vec<ButtonAction>,
    fail: bool,
}

impl RecordingGateway {
    pub fn with_supported_actions(actions: Vec<ButtonAction>) -> Self {
        Self {
            supported_actions: actions,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), anyhow::Error> {
        if self.fail {
            return Err(anyhow::anyhow!("device unreachable"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl CommandGateway for RecordingGateway {
    async fn turn_on(&self, _device_id: &str) -> Result<(), anyhow::Error> {
        self.record("turn_on".to_string())
    }

    async fn turn_off(&self, _device_id: &str) -> Result<(), anyhow::Error> {
        self.record("turn_off".to_string())
    }

    async fn set_level(&self, _device_id: &str, level: u8) -> Result<(), anyhow::Error> {
        self.record(format!("set_level({})", level))
    }

    async fn press_button(
        &self,
        _device_id: &str,
        action: ButtonAction,
        number: u16,
    ) -> Result<(), anyhow::Error> {
        self.record(format!("press_button({},{})", action, number))
    }

    async fn current_state(&self, _device_id: &str) -> Result<DesiredState, anyhow::Error> {
        Ok(DesiredState::Off)
    }

    async fn current_level(&self, _device_id: &str) -> Result<u8, anyhow::Error> {
        Ok(0)
    }

    async fn supported_button_actions(
        &self,
        _device_id: &str,
    ) -> Result<Vec<ButtonAction>, anyhow::Error> {
        Ok(self.supported_actions.clone())
    }
}

/// 固定模式源
pub(crate) struct StaticMode(pub &'static str);

#[async_trait]
impl ModeSource for StaticMode {
    async fn current_mode(&self) -> Result<String, anyhow::Error> {
        Ok(self.0.to_string())
    }
}

/// 固定开关状态源
pub(crate) struct StaticSwitch(pub bool);

#[async_trait]
impl SwitchSource for StaticSwitch {
    async fn is_on(&self) -> Result<bool, anyhow::Error> {
        Ok(self.0)
    }
}

/// 固定日出/日落的测试提供方
pub(crate) struct FixedSolar {
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
    pub today: NaiveDate,
}

#[async_trait]
impl SolarProvider for FixedSolar {
    async fn sunrise_sunset(&self, offset_minutes: i32) -> Result<SolarTimes, anyhow::Error> {
        let offset = chrono::Duration::minutes(offset_minutes as i64);
        Ok(SolarTimes {
            sunrise: self.today.and_time(self.sunrise) + offset,
            sunset: self.today.and_time(self.sunset) + offset,
        })
    }
}

/// 内存变量表的测试存储
pub(crate) struct MapVariables {
    values: Mutex<HashMap<String, String>>,
}

impl MapVariables {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            values: Mutex::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl VariableStore for MapVariables {
    async fn get(&self, name: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.values.lock().unwrap().get(name).cloned())
    }

    async fn mark_in_use(&self, _name: &str) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn clear_in_use(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
