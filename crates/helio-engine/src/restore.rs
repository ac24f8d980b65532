use chrono::NaiveDateTime;
use tracing::{debug, info};

use helio_schedule::{compile, select, Device, ResolveContext, TimeSpec};
use helio_types::Capability;

/// 恢复回放的回看窗口（天）
pub const LOOKBACK_DAYS: i64 = 7;

/// 一条待回放的历史触发
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreAction {
    pub device_id: String,
    pub schedule_id: String,
    /// 该日程在回看窗口内最近一次的理论触发时刻
    pub fired_at: NaiveDateTime,
}

/// 计算重启后需要回放的触发
///
/// 每台设备独立：在未暂停的日程里找回看窗口内最近一次理论触发，
/// 全设备取最近者。胜出日程若关闭了恢复，则整台设备跳过，不回退
/// 到次近的日程。按键设备无安全的回放语义，整体跳过。
pub async fn plan(
    devices: &[Device],
    now: NaiveDateTime,
    ctx: &ResolveContext<'_>,
) -> Vec<RestoreAction> {
    let mut actions = Vec::new();

    for device in devices {
        if device.capability == Capability::Button {
            debug!(device_id = %device.id, "Button device, no replay semantics");
            continue;
        }

        let mut winner: Option<(NaiveDateTime, &helio_schedule::Schedule)> = None;

        for schedule in &device.schedules {
            if schedule.pause {
                continue;
            }
            let Some(fired_at) = last_firing(schedule, now, ctx).await else {
                continue;
            };
            // 平局保留先遇到的日程（确定性）
            let later = match winner {
                Some((current, _)) => fired_at > current,
                None => true,
            };
            if later {
                winner = Some((fired_at, schedule));
            }
        }

        match winner {
            Some((fired_at, schedule)) if schedule.restore => {
                info!(
                    device_id = %device.id,
                    schedule_id = %schedule.id,
                    fired_at = %fired_at,
                    "Restore candidate selected"
                );
                actions.push(RestoreAction {
                    device_id: device.id.clone(),
                    schedule_id: schedule.id.clone(),
                    fired_at,
                });
            }
            Some((_, schedule)) => {
                // 最近者未启用恢复：整台设备不回放
                info!(
                    device_id = %device.id,
                    schedule_id = %schedule.id,
                    "Most recent firing is restore-disabled, device skipped"
                );
            }
            None => {
                debug!(device_id = %device.id, "No firing within lookback window");
            }
        }
    }

    actions
}

/// 单条日程在回看窗口内最近一次理论触发
async fn last_firing(
    schedule: &helio_schedule::Schedule,
    now: NaiveDateTime,
    ctx: &ResolveContext<'_>,
) -> Option<NaiveDateTime> {
    let selection = select(
        &schedule.time,
        schedule.secondary_time.as_ref(),
        schedule.earlier_later,
        ctx,
    )
    .await;
    let resolved = selection.resolved.resolved()?;

    // 带明确日期的变量时间是一次性触发，只在其精确时刻发生过一次。
    // 绝不落回周期回扫：周期回扫会虚构出变量日期门限当天本会拦下的
    // 历史触发。
    if matches!(selection.effective, TimeSpec::Variable { .. }) && resolved.has_date() {
        let fired_at = resolved.instant(ctx.today);
        if fired_at >= now {
            // 未来（或今天尚未到时刻）的一次性触发还没发生
            return None;
        }
        let floor = now - chrono::Duration::days(LOOKBACK_DAYS);
        return (fired_at >= floor).then_some(fired_at);
    }

    // 固定/太阳/无日期变量：沿编译出的周期触发回扫
    let trigger = compile(&resolved, schedule.days)?;
    trigger.last_occurrence_before(now, LOOKBACK_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FixedSolar, MapVariables};
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use helio_schedule::Schedule;
    use helio_types::DaySet;

    fn today() -> NaiveDate {
        // 2024-03-04 是周一
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn now() -> NaiveDateTime {
        today().and_hms_opt(20, 0, 0).unwrap()
    }

    fn solar() -> FixedSolar {
        FixedSolar {
            sunrise: NaiveTime::from_hms_opt(6, 42, 0).unwrap(),
            sunset: NaiveTime::from_hms_opt(18, 7, 0).unwrap(),
            today: today(),
        }
    }

    fn ctx<'a>(solar: &'a FixedSolar, vars: &'a MapVariables) -> ResolveContext<'a> {
        ResolveContext {
            today: today(),
            solar,
            variables: vars,
        }
    }

    fn fixed_schedule(h: u32, m: u32) -> Schedule {
        Schedule {
            time: TimeSpec::Fixed {
                time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_restores_most_recent_firing() {
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![fixed_schedule(6, 0), fixed_schedule(18, 0)];
        let expected = device.schedules[1].id.clone();

        let solar = solar();
        let vars = MapVariables::new(&[]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].schedule_id, expected);
        assert_eq!(actions[0].fired_at, today().and_hms_opt(18, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_restore_disabled_winner_suppresses_device() {
        // 两天前触发的启用恢复，一天前触发的关闭恢复：整台设备不回放
        let mut older = fixed_schedule(18, 0);
        older.days = DaySet::from_days(&[Weekday::Sat]); // 两天前（3/2 周六）
        older.restore = true;

        let mut newer = fixed_schedule(18, 0);
        newer.days = DaySet::from_days(&[Weekday::Sun]); // 一天前（3/3 周日）
        newer.restore = false;

        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![older, newer];

        let solar = solar();
        let vars = MapVariables::new(&[]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_firing_outside_window_not_restored() {
        // 变量带有 8 天前的日期，超出 7 天回看窗口
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![Schedule {
            time: TimeSpec::Variable {
                name: "one_shot".to_string(),
                offset_minutes: 0,
            },
            ..Default::default()
        }];

        let solar = solar();
        let vars = MapVariables::new(&[("one_shot", "2024-02-25T18:00:00")]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_past_dated_variable_within_window_restored() {
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![Schedule {
            time: TimeSpec::Variable {
                name: "one_shot".to_string(),
                offset_minutes: 0,
            },
            ..Default::default()
        }];
        let schedule_id = device.schedules[0].id.clone();

        let solar = solar();
        let vars = MapVariables::new(&[("one_shot", "2024-03-02T18:00:00")]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].schedule_id, schedule_id);
        assert_eq!(
            actions[0].fired_at,
            NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap()
        );
    }

    fn variable_schedule(name: &str) -> Schedule {
        Schedule {
            time: TimeSpec::Variable {
                name: name.to_string(),
                offset_minutes: 0,
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_future_dated_variable_not_replayed() {
        // 明天的一次性触发还没发生过，回扫不得虚构历史触发
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![variable_schedule("one_shot")];

        let solar = solar();
        let vars = MapVariables::new(&[("one_shot", "2024-03-05T18:00:00")]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_today_dated_variable_after_time_replayed() {
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![variable_schedule("one_shot")];
        let schedule_id = device.schedules[0].id.clone();

        let solar = solar();
        let vars = MapVariables::new(&[("one_shot", "2024-03-04T18:00:00")]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].schedule_id, schedule_id);
        assert_eq!(actions[0].fired_at, today().and_hms_opt(18, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_today_dated_variable_before_time_not_replayed() {
        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![variable_schedule("one_shot")];

        let solar = solar();
        let vars = MapVariables::new(&[("one_shot", "2024-03-04T22:00:00")]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_paused_schedules_not_considered() {
        let mut paused = fixed_schedule(18, 0);
        paused.pause = true;

        let mut device = Device::new("lamp", Capability::Switch);
        device.schedules = vec![paused];

        let solar = solar();
        let vars = MapVariables::new(&[]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_button_devices_skipped() {
        let mut device = Device::new("remote", Capability::Button);
        device.schedules = vec![fixed_schedule(18, 0)];

        let solar = solar();
        let vars = MapVariables::new(&[]);
        let actions = plan(&[device], now(), &ctx(&solar, &vars)).await;
        assert!(actions.is_empty());
    }
}
