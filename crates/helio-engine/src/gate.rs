use chrono::NaiveDate;
use tracing::{error, info, warn};

use helio_schedule::{Schedule, TimeSpec, VariableStore};
use helio_types::ResolvedTime;

use crate::config::EngineConfig;
use crate::gateway::{ModeSource, SwitchSource};

/// 跳过原因
///
/// 跳过是正常控制流而非错误，每种原因单独可辨地记日志。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 全局暂停
    GlobalPause,

    /// 当前模式不在白名单
    ModeNotAllowed(String),

    /// 激活开关状态不符
    ActivationSwitch,

    /// 日程自身暂停
    SchedulePaused,

    /// 变量携带的日期不是今天（一次性变量已过期/未到期的防护）
    VariableDateMismatch(NaiveDate),
}

/// 门限判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Skip(SkipReason),
}

/// 全局门限（全局暂停 → 模式 → 激活开关），固定顺序短路
///
/// 触发回调逐次调用；恢复回放在启动时整体调用一次。
pub async fn evaluate_global(
    config: &EngineConfig,
    mode: &dyn ModeSource,
    switch: Option<&dyn SwitchSource>,
) -> Option<SkipReason> {
    if config.pause_all {
        info!("All schedules paused");
        return Some(SkipReason::GlobalPause);
    }

    if let Some(allowed) = &config.allowed_modes {
        match mode.current_mode().await {
            Ok(current) => {
                if !allowed.iter().any(|m| m == &current) {
                    info!(mode = %current, "Mode not in allowed list, skipping");
                    return Some(SkipReason::ModeNotAllowed(current));
                }
            }
            Err(e) => {
                error!(error = %e, "Mode source read failed, skipping");
                return Some(SkipReason::ModeNotAllowed(String::new()));
            }
        }
    }

    if let Some(expectation) = &config.activation_switch {
        match switch {
            Some(switch) => match switch.is_on().await {
                Ok(is_on) => {
                    if is_on != expectation.expect_on {
                        info!(
                            expected_on = %expectation.expect_on,
                            actual_on = %is_on,
                            "Activation switch state mismatch, skipping"
                        );
                        return Some(SkipReason::ActivationSwitch);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Activation switch read failed, skipping");
                    return Some(SkipReason::ActivationSwitch);
                }
            },
            // 配置了开关门限但宿主未绑定开关：配置缺口，按门限未启用处理
            None => warn!("Activation switch gate configured but no switch bound"),
        }
    }

    None
}

/// 单次触发的完整门限链，固定顺序短路：
/// 全局暂停 → 模式 → 激活开关 → 日程暂停 → 变量日期有效性
///
/// 变量日期门限只有走到第 5 步才会读取变量存储。
pub async fn evaluate(
    schedule: &Schedule,
    effective: &TimeSpec,
    today: NaiveDate,
    config: &EngineConfig,
    mode: &dyn ModeSource,
    switch: Option<&dyn SwitchSource>,
    variables: &dyn VariableStore,
) -> GateDecision {
    if let Some(reason) = evaluate_global(config, mode, switch).await {
        return GateDecision::Skip(reason);
    }

    if schedule.pause {
        info!(schedule_id = %schedule.id, "Schedule paused, skipping");
        return GateDecision::Skip(SkipReason::SchedulePaused);
    }

    if let TimeSpec::Variable { name, .. } = effective {
        let raw = match variables.get(name).await {
            Ok(Some(raw)) => raw,
            // 变量此刻不存在则无从校验，放行
            Ok(None) => return GateDecision::Proceed,
            Err(e) => {
                warn!(
                    schedule_id = %schedule.id,
                    variable = %name,
                    error = %e,
                    "Variable store read failed, proceeding without date check"
                );
                return GateDecision::Proceed;
            }
        };
        if let Some(value) = ResolvedTime::parse(&raw) {
            if let Some(date) = value.date {
                // 仅比日期，忽略时刻与时区偏移
                if date != today {
                    info!(
                        schedule_id = %schedule.id,
                        variable = %name,
                        variable_date = %date,
                        "Variable date is not today, skipping"
                    );
                    return GateDecision::Skip(SkipReason::VariableDateMismatch(date));
                }
            }
        }
    }

    GateDecision::Proceed
}
