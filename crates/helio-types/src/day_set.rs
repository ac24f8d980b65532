use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// 每周触发日集合
///
/// 七个独立的布尔位，对应周日到周六。默认全部启用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySet {
    pub sun: bool,
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
}

impl Default for DaySet {
    fn default() -> Self {
        Self::ALL
    }
}

impl DaySet {
    /// 全部启用
    pub const ALL: DaySet = DaySet {
        sun: true,
        mon: true,
        tue: true,
        wed: true,
        thu: true,
        fri: true,
        sat: true,
    };

    /// 全部禁用
    pub const NONE: DaySet = DaySet {
        sun: false,
        mon: false,
        tue: false,
        wed: false,
        thu: false,
        fri: false,
        sat: false,
    };

    /// 从周几列表构造
    pub fn from_days(days: &[Weekday]) -> Self {
        let mut set = Self::NONE;
        for day in days {
            set.set(*day, true);
        }
        set
    }

    /// 是否为空集
    pub fn is_empty(&self) -> bool {
        !(self.sun || self.mon || self.tue || self.wed || self.thu || self.fri || self.sat)
    }

    /// 是否包含指定周几
    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Sun => self.sun,
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
        }
    }

    /// 设置指定周几
    pub fn set(&mut self, day: Weekday, enabled: bool) {
        match day {
            Weekday::Sun => self.sun = enabled,
            Weekday::Mon => self.mon = enabled,
            Weekday::Tue => self.tue = enabled,
            Weekday::Wed => self.wed = enabled,
            Weekday::Thu => self.thu = enabled,
            Weekday::Fri => self.fri = enabled,
            Weekday::Sat => self.sat = enabled,
        }
    }

    /// 按周日起始顺序迭代启用的周几
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ]
        .into_iter()
        .filter(|d| self.contains(*d))
    }

    /// 渲染为 cron 表达式的周几字段（如 "Mon,Wed,Fri"）
    pub fn cron_field(&self) -> String {
        let names: Vec<&str> = self
            .iter()
            .map(|d| match d {
                Weekday::Sun => "Sun",
                Weekday::Mon => "Mon",
                Weekday::Tue => "Tue",
                Weekday::Wed => "Wed",
                Weekday::Thu => "Thu",
                Weekday::Fri => "Fri",
                Weekday::Sat => "Sat",
            })
            .collect();
        names.join(",")
    }
}
