use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// 已解析的触发时间
///
/// 日期与时间分量各自可缺失：外部变量可能只存日期或只存时间。
/// 缺失标记必须在偏移运算中保留，对纯时间值加偏移不得凭空产生日期，
/// 反之亦然。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTime {
    /// 日期分量（缺失表示纯时间值）
    pub date: Option<NaiveDate>,

    /// 时间分量（缺失表示纯日期值）
    pub time: Option<NaiveTime>,
}

/// 变量原始字符串的解析尝试顺序
///
/// 显式的有序列表，不用异常回退。带时区的形式单独处理。
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

impl ResolvedTime {
    /// 完整的日期时间值
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            date: Some(dt.date()),
            time: Some(dt.time()),
        }
    }

    /// 纯日期值
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            time: None,
        }
    }

    /// 纯时间值
    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            date: None,
            time: Some(time),
        }
    }

    /// 按有序格式列表解析变量原始字符串
    ///
    /// 依次尝试：带时区的完整时间戳、不带时区的完整时间戳、纯日期、纯时间。
    /// 全部失败返回 `None`，由调用方记录并按未解析处理。
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        // 带时区的完整时间戳，保留本地挂钟分量，丢弃时区偏移
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::from_datetime(dt.naive_local()));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(Self::from_datetime(dt.naive_local()));
        }

        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::from_datetime(dt));
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Some(Self::from_date(date));
            }
        }
        for format in TIME_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(raw, format) {
                return Some(Self::from_time(time));
            }
        }
        None
    }

    /// 是否带有明确的日期分量
    pub fn has_date(&self) -> bool {
        self.date.is_some()
    }

    /// 施加分钟偏移
    ///
    /// 完整值按日历运算（跨日进位正确）；纯时间值在一天内回绕，
    /// 不产生日期分量；纯日期值以当日零点为基准，非零偏移会引入
    /// 时间分量（负偏移可能回退日期）。
    pub fn offset(&self, minutes: i32) -> Self {
        if minutes == 0 {
            return *self;
        }
        match (self.date, self.time) {
            (Some(date), Some(time)) => {
                Self::from_datetime(date.and_time(time) + Duration::minutes(minutes as i64))
            }
            (None, Some(time)) => {
                let total = time.num_seconds_from_midnight() as i64 + minutes as i64 * 60;
                let wrapped = total.rem_euclid(86_400) as u32;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(wrapped, 0)
                    .unwrap_or(NaiveTime::MIN);
                Self::from_time(time)
            }
            (Some(date), None) => Self::from_datetime(
                date.and_time(NaiveTime::MIN) + Duration::minutes(minutes as i64),
            ),
            (None, None) => *self,
        }
    }

    /// 触发用的时刻分量（缺失按零点处理）
    pub fn time_of_day(&self) -> NaiveTime {
        self.time.unwrap_or(NaiveTime::MIN)
    }

    /// 折算为可比较的瞬时值
    ///
    /// 缺失的日期按 `today` 补齐，缺失的时间按零点补齐。
    pub fn instant(&self, today: NaiveDate) -> NaiveDateTime {
        self.date.unwrap_or(today).and_time(self.time_of_day())
    }
}

impl std::fmt::Display for ResolvedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.date, self.time) {
            (Some(date), Some(time)) => write!(f, "{}T{}", date.format("%Y-%m-%d"), time.format("%H:%M:%S")),
            (Some(date), None) => write!(f, "{}", date.format("%Y-%m-%d")),
            (None, Some(time)) => write!(f, "{}", time.format("%H:%M:%S")),
            (None, None) => write!(f, "-"),
        }
    }
}
