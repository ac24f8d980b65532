use tracing::{error, warn};

use helio_types::ResolvedTime;

use crate::model::TimeSpec;
use crate::providers::ResolveContext;

/// 时间解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// 解析出的具体时间
    Resolved(ResolvedTime),

    /// 本轮无法解析（不是错误，调用方按"本轮不编译触发器"处理）
    Unresolved(UnresolvedReason),
}

/// 未解析原因
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// 变量不存在
    VariableMissing(String),

    /// 变量值无法解析为时间戳
    VariableUnparsable(String),

    /// 太阳时间提供方无当日数据
    SolarUnavailable,
}

impl Resolution {
    /// 解析成功时取值
    pub fn resolved(&self) -> Option<ResolvedTime> {
        match self {
            Resolution::Resolved(value) => Some(*value),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// 将声明式时间描述解析为具体时间
///
/// 对提供方快照是纯函数；任何失败都落到 `Unresolved`，不让调用方崩溃。
pub async fn resolve(spec: &TimeSpec, ctx: &ResolveContext<'_>) -> Resolution {
    match spec {
        TimeSpec::Fixed { time } => {
            Resolution::Resolved(ResolvedTime::from_datetime(ctx.today.and_time(*time)))
        }
        TimeSpec::Solar {
            use_sunset,
            offset_minutes,
        } => match ctx.solar.sunrise_sunset(*offset_minutes).await {
            Ok(times) => {
                let chosen = if *use_sunset { times.sunset } else { times.sunrise };
                Resolution::Resolved(ResolvedTime::from_datetime(chosen))
            }
            Err(e) => {
                warn!(error = %e, "Solar provider returned no data for today");
                Resolution::Unresolved(UnresolvedReason::SolarUnavailable)
            }
        },
        TimeSpec::Variable {
            name,
            offset_minutes,
        } => {
            let raw = match ctx.variables.get(name).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    warn!(variable = %name, "Variable not found");
                    return Resolution::Unresolved(UnresolvedReason::VariableMissing(name.clone()));
                }
                Err(e) => {
                    error!(variable = %name, error = %e, "Variable store read failed");
                    return Resolution::Unresolved(UnresolvedReason::VariableMissing(name.clone()));
                }
            };
            match ResolvedTime::parse(&raw) {
                Some(value) => Resolution::Resolved(value.offset(*offset_minutes)),
                None => {
                    error!(variable = %name, raw = %raw, "Variable value is not a parsable timestamp");
                    Resolution::Unresolved(UnresolvedReason::VariableUnparsable(name.clone()))
                }
            }
        }
    }
}
