use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::providers::{ResolveContext, SolarProvider, SolarTimes, VariableStore};

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
    pub values: Mutex<HashMap<String, String>>,
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

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

pub(crate) fn solar() -> FixedSolar {
    FixedSolar {
        sunrise: NaiveTime::from_hms_opt(6, 42, 0).unwrap(),
        sunset: NaiveTime::from_hms_opt(18, 7, 0).unwrap(),
        today: today(),
    }
}

pub(crate) fn context<'a>(
    today: NaiveDate,
    solar: &'a FixedSolar,
    variables: &'a MapVariables,
) -> ResolveContext<'a> {
    ResolveContext {
        today,
        solar,
        variables,
    }
}
