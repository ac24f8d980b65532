use tracing::debug;

use crate::model::{SelectionPolicy, TimeSpec};
use crate::providers::ResolveContext;
use crate::resolve::{resolve, Resolution};

/// 双时间取舍结果
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// 最终生效的时间描述
    pub effective: TimeSpec,

    /// 生效描述的解析结果
    pub resolved: Resolution,

    /// 是否选中了第二时间
    pub is_secondary: bool,
}

/// 在主/第二时间描述之间取舍
///
/// 取舍不可独立缓存，任一侧输入变化（太阳漂移、变量变更、手工编辑）
/// 都必须重算。两侧相等时取主时间。
pub async fn select(
    primary: &TimeSpec,
    secondary: Option<&TimeSpec>,
    policy: SelectionPolicy,
    ctx: &ResolveContext<'_>,
) -> Selection {
    let secondary = match (policy, secondary) {
        (SelectionPolicy::None, _) | (_, None) => {
            return Selection {
                effective: primary.clone(),
                resolved: resolve(primary, ctx).await,
                is_secondary: false,
            };
        }
        (_, Some(secondary)) => secondary,
    };

    let primary_resolution = resolve(primary, ctx).await;
    let secondary_resolution = resolve(secondary, ctx).await;

    let secondary_wins = match (
        primary_resolution.resolved(),
        secondary_resolution.resolved(),
    ) {
        // 一侧未解析时另一侧无条件胜出
        (None, Some(_)) => true,
        (Some(_), None) | (None, None) => false,
        (Some(p), Some(s)) => {
            let p = p.instant(ctx.today);
            let s = s.instant(ctx.today);
            match policy {
                SelectionPolicy::Earlier => s < p,
                SelectionPolicy::Later => s > p,
                SelectionPolicy::None => false,
            }
        }
    };

    if secondary_wins {
        debug!(policy = ?policy, "Secondary time wins selection");
        Selection {
            effective: secondary.clone(),
            resolved: secondary_resolution,
            is_secondary: true,
        }
    } else {
        Selection {
            effective: primary.clone(),
            resolved: primary_resolution,
            is_secondary: false,
        }
    }
}
