use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use helio_types::{ButtonAction, Capability, DaySet, DesiredState};

use crate::compile::RecurringTrigger;

/// 触发时间的声明式描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeSpec {
    /// 固定挂钟时间，解析时套用到"今天"
    Fixed {
        time: NaiveTime,
    },

    /// 日出/日落加偏移，每日由太阳时间提供方重新计算
    Solar {
        /// true 取日落，false 取日出
        use_sunset: bool,
        /// 分钟偏移
        offset_minutes: i32,
    },

    /// 外部命名变量加偏移
    Variable {
        /// 变量名
        name: String,
        /// 分钟偏移
        offset_minutes: i32,
    },
}

impl TimeSpec {
    /// 引用的变量名（非变量来源返回 None）
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            TimeSpec::Variable { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// 引用的变量名改名时重写
    pub fn rename_variable(&mut self, old: &str, new: &str) -> bool {
        if let TimeSpec::Variable { name, .. } = self {
            if name == old {
                *name = new.to_string();
                return true;
            }
        }
        false
    }
}

impl Default for TimeSpec {
    fn default() -> Self {
        TimeSpec::Fixed {
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// 双时间取舍策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// 不启用第二时间
    #[default]
    None,

    /// 取较早者
    Earlier,

    /// 取较晚者
    Later,
}

/// 单条触发规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// 日程 ID（设备内唯一）
    pub id: String,

    /// 每周触发日集合
    pub days: DaySet,

    /// 主时间描述
    pub time: TimeSpec,

    /// 第二时间描述（取舍策略非 None 时生效）
    pub secondary_time: Option<TimeSpec>,

    /// 双时间取舍策略
    pub earlier_later: SelectionPolicy,

    /// 暂停：触发后不执行
    pub pause: bool,

    /// 是否参与重启恢复
    pub restore: bool,

    /// 目标开关状态
    pub desired_state: DesiredState,

    /// 目标亮度（0-100，仅调光器且目标为开时有意义）
    pub desired_level: u8,

    /// 按键编号（仅按键设备）
    pub button_number: u16,

    /// 按键动作（仅按键设备）
    pub button_action: Option<ButtonAction>,

    /// 派生缓存：编译出的周期触发描述符，随时间描述或触发日变更重算
    pub cron: Option<RecurringTrigger>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            id: format!("run_{}", uuid::Uuid::new_v4().simple()),
            days: DaySet::ALL,
            time: TimeSpec::default(),
            secondary_time: None,
            earlier_later: SelectionPolicy::None,
            pause: false,
            restore: true,
            desired_state: DesiredState::On,
            desired_level: 100,
            button_number: 1,
            button_action: None,
            cron: None,
        }
    }
}

impl Schedule {
    /// 是否启用了第二时间
    pub fn has_secondary(&self) -> bool {
        self.earlier_later != SelectionPolicy::None && self.secondary_time.is_some()
    }

    /// 归一化旧持久化形态
    ///
    /// 取舍策略已设置但缺少第二时间描述时补默认值；亮度收敛到 0-100。
    pub fn normalize(&mut self) {
        if self.earlier_later != SelectionPolicy::None && self.secondary_time.is_none() {
            self.secondary_time = Some(TimeSpec::default());
        }
        if self.desired_level > 100 {
            self.desired_level = 100;
        }
    }
}

/// 受管设备
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// 设备 ID（全局唯一）
    pub id: String,

    /// 设备名称
    pub name: String,

    /// 显示顺序（每次列表渲染时重算，不参与执行语义）
    pub zone: u32,

    /// 选定的设备能力
    pub capability: Capability,

    /// 日程列表（插入序稳定，永不为空）
    pub schedules: Vec<Schedule>,
}

impl Device {
    /// 创建新设备并附带一条默认日程
    pub fn new(name: impl Into<String>, capability: Capability) -> Self {
        Self {
            id: format!("dev_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            zone: 0,
            capability,
            schedules: vec![Schedule::default()],
        }
    }

    /// 按 ID 查找日程
    pub fn schedule(&self, schedule_id: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == schedule_id)
    }

    /// 按 ID 查找日程（可变）
    pub fn schedule_mut(&mut self, schedule_id: &str) -> Option<&mut Schedule> {
        self.schedules.iter_mut().find(|s| s.id == schedule_id)
    }

    /// 归一化旧持久化形态
    ///
    /// 空日程列表补回一条默认日程，维持"设备至少一条日程"的不变式。
    pub fn normalize(&mut self) {
        if self.schedules.is_empty() {
            self.schedules.push(Schedule::default());
        }
        for schedule in &mut self.schedules {
            schedule.normalize();
        }
    }
}
