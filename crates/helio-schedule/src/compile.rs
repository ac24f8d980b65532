use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

use helio_types::{DaySet, ResolvedTime};

/// 周期触发描述符
///
/// 分钟粒度、按周几重复，供外部调度原语消费。相同输入编译出逐字节
/// 相同的描述符，外部调度器可安全去重覆盖。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTrigger {
    pub minute: u8,
    pub hour: u8,
    pub days: DaySet,
}

impl RecurringTrigger {
    /// 渲染为六字段 cron 表达式（秒 分 时 日 月 周）
    pub fn to_cron(&self) -> String {
        format!("0 {} {} * * {}", self.minute, self.hour, self.days.cron_field())
    }

    /// 触发时刻分量
    pub fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }

    /// `now` 之前、回看窗口之内的最近一次理论触发
    ///
    /// 从 `now` 当日起逐日回退扫描，命中第一个（即最近的）严格早于
    /// `now` 的触发时刻即返回。
    pub fn last_occurrence_before(
        &self,
        now: NaiveDateTime,
        lookback_days: i64,
    ) -> Option<NaiveDateTime> {
        let floor = now - Duration::days(lookback_days);
        let time = self.time_of_day();
        for back in 0..=lookback_days {
            let date = now.date() - Duration::days(back);
            if !self.days.contains(date.weekday()) {
                continue;
            }
            let candidate = date.and_time(time);
            if candidate < now && candidate >= floor {
                return Some(candidate);
            }
        }
        None
    }
}

/// 把生效时间与触发日集合编译为周期触发描述符
///
/// 秒及以下截断（触发粒度为一分钟）。空触发日集合是配置缺口而非
/// 错误：记 warn，返回 `None`，调用方不得注册任何触发器。
pub fn compile(effective: &ResolvedTime, days: DaySet) -> Option<RecurringTrigger> {
    if days.is_empty() {
        warn!("Empty day set, no trigger compiled");
        return None;
    }
    let time = effective.time_of_day();
    Some(RecurringTrigger {
        minute: time.minute() as u8,
        hour: time.hour() as u8,
        days,
    })
}
