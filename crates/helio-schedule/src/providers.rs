use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

/// 某日的日出/日落时间（本地挂钟，已含偏移）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarTimes {
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

/// 太阳时间提供方
///
/// 太阳时间逐日漂移，必须每次调用现算，不可缓存常量。
#[async_trait]
pub trait SolarProvider: Send + Sync {
    /// 取"今天"的日出/日落并施加分钟偏移
    async fn sunrise_sunset(&self, offset_minutes: i32) -> Result<SolarTimes, anyhow::Error>;
}

/// 外部变量存储
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// 读取命名变量的原始时间戳字符串，不存在返回 `None`
    async fn get(&self, name: &str) -> Result<Option<String>, anyhow::Error>;

    /// 登记变量被引用（影响存储侧的改名通知）
    async fn mark_in_use(&self, name: &str) -> Result<(), anyhow::Error>;

    /// 清空全部引用登记
    async fn clear_in_use(&self) -> Result<(), anyhow::Error>;
}

/// 时间解析上下文
///
/// 提供方快照加"今天"，解析结果对同一快照是纯函数。
pub struct ResolveContext<'a> {
    pub today: NaiveDate,
    pub solar: &'a dyn SolarProvider,
    pub variables: &'a dyn VariableStore,
}
