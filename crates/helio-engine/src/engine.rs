use chrono::Local;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use helio_schedule::{
    compile, select, RecurringTrigger, Resolution, ResolveContext, ScheduleStore, SolarProvider,
    TimeSpec, VariableStore,
};

use crate::config::EngineConfig;
use crate::dispatch;
use crate::error::{EngineError, Result};
use crate::gate::{self, GateDecision};
use crate::gateway::{CommandGateway, ModeSource, SwitchSource};
use crate::restore;

/// 引擎构造参数
pub struct EngineParams {
    pub store: Arc<ScheduleStore>,
    pub solar: Arc<dyn SolarProvider>,
    pub variables: Arc<dyn VariableStore>,
    pub gateway: Arc<dyn CommandGateway>,
    pub mode: Arc<dyn ModeSource>,
    pub switch: Option<Arc<dyn SwitchSource>>,
    pub config: EngineConfig,
}

/// 调度引擎
///
/// 持有声明式模型与外部调度原语之间的全部粘合：刷新 pass、触发
/// 注册、触发回调的门限与分发、启动恢复。
pub struct ScheduleEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<ScheduleStore>,
    solar: Arc<dyn SolarProvider>,
    variables: Arc<dyn VariableStore>,
    gateway: Arc<dyn CommandGateway>,
    mode: Arc<dyn ModeSource>,
    switch: Option<Arc<dyn SwitchSource>>,
    config: RwLock<EngineConfig>,
    scheduler: RwLock<Option<JobScheduler>>,
    /// 整个刷新 pass 串行化：编辑路径与每日刷新任务可能并发进入，
    /// 注销与注册之间被抢占会泄漏永不注销的旧任务
    refresh_pass: Mutex<()>,
    /// 当前注册的触发任务，刷新时整批换掉
    trigger_jobs: RwLock<Vec<Uuid>>,
    /// 每日刷新任务
    refresh_job: RwLock<Option<Uuid>>,
}

/// 刷新小时内选一个空闲分钟
///
/// 返回 (分钟, 是否兜底)。整点 60 个分钟都被触发占满时退回兜底
/// 分钟——已知竞态：该分钟的触发当天可能被挤掉一次。
fn pick_free_minute(occupied: &[u8], default_minute: u8) -> (u8, bool) {
    for minute in 0..60u8 {
        if !occupied.contains(&minute) {
            return (minute, false);
        }
    }
    (default_minute, true)
}

impl ScheduleEngine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: params.store,
                solar: params.solar,
                variables: params.variables,
                gateway: params.gateway,
                mode: params.mode,
                switch: params.switch,
                config: RwLock::new(params.config),
                scheduler: RwLock::new(None),
                refresh_pass: Mutex::new(()),
                trigger_jobs: RwLock::new(Vec::new()),
                refresh_job: RwLock::new(None),
            }),
        }
    }

    /// 启动外部调度原语并做首次刷新
    pub async fn start(&self) -> Result<()> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        *self.inner.scheduler.write().await = Some(scheduler);

        info!("Schedule engine started");
        self.inner.refresh().await
    }

    /// 停止并注销全部触发
    pub async fn stop(&self) -> Result<()> {
        if let Some(mut scheduler) = self.inner.scheduler.write().await.take() {
            scheduler.shutdown().await?;
        }
        self.inner.trigger_jobs.write().await.clear();
        *self.inner.refresh_job.write().await = None;

        info!("Schedule engine stopped");
        Ok(())
    }

    /// 全量刷新：重算生效时间、重编译、整批重注册
    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    /// 宿主重启信号：执行一次恢复回放
    pub async fn on_boot(&self) -> Result<()> {
        self.inner.on_boot().await
    }

    /// 外部变量值变更通知
    pub async fn on_variable_changed(&self, name: &str) -> Result<()> {
        debug!(variable = %name, "Variable changed, refreshing");
        self.inner.refresh().await
    }

    /// 外部变量改名通知：重写全部引用后刷新
    pub async fn on_variable_renamed(&self, old: &str, new: &str) -> Result<()> {
        self.inner.store.rename_variable(old, new).await;
        self.inner.refresh().await
    }

    /// 全局暂停开关
    pub async fn pause_all(&self, paused: bool) {
        self.inner.config.write().await.pause_all = paused;
        info!(paused = %paused, "Global pause updated");
    }

    /// 应用一次日程编辑并刷新触发注册
    pub async fn apply_edit<F>(
        &self,
        device_id: &str,
        schedule_id: &str,
        edit: F,
    ) -> Result<helio_schedule::Schedule>
    where
        F: FnOnce(&mut helio_schedule::Schedule),
    {
        let updated = self
            .inner
            .store
            .update_schedule(device_id, schedule_id, edit)
            .await?;
        self.inner.refresh().await?;
        Ok(updated)
    }

    /// 暂停/恢复单条日程
    pub async fn set_pause(
        &self,
        device_id: &str,
        schedule_id: &str,
        paused: bool,
    ) -> Result<helio_schedule::Schedule> {
        self.apply_edit(device_id, schedule_id, |s| s.pause = paused)
            .await
    }

    /// 单条日程的启动恢复开关
    pub async fn set_restore(
        &self,
        device_id: &str,
        schedule_id: &str,
        restore: bool,
    ) -> Result<helio_schedule::Schedule> {
        self.apply_edit(device_id, schedule_id, |s| s.restore = restore)
            .await
    }

    /// 模型存储（编辑路径共享）
    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.inner.store
    }
}

impl EngineInner {
    fn resolve_context(&self, today: chrono::NaiveDate) -> ResolveContext<'_> {
        ResolveContext {
            today,
            solar: &*self.solar,
            variables: &*self.variables,
        }
    }

    /// 刷新 pass
    ///
    /// 先在模型快照上算出整套新描述符，再在一次换表里注销旧任务、
    /// 注册新任务、回写编译缓存，避免触发回调读到半更新状态。
    async fn refresh(self: &Arc<Self>) -> Result<()> {
        let _pass = self.refresh_pass.lock().await;
        let config = self.config.read().await.clone();
        let today = Local::now().date_naive();
        let devices = self.store.list().await;

        let ctx = self.resolve_context(today);
        let mut updates: Vec<(String, String, Option<RecurringTrigger>)> = Vec::new();
        let mut registrations: Vec<(String, String, TimeSpec, RecurringTrigger)> = Vec::new();

        for device in &devices {
            for schedule in &device.schedules {
                let selection = select(
                    &schedule.time,
                    schedule.secondary_time.as_ref(),
                    schedule.earlier_later,
                    &ctx,
                )
                .await;
                match selection.resolved {
                    Resolution::Resolved(resolved) => {
                        let trigger = compile(&resolved, schedule.days);
                        updates.push((device.id.clone(), schedule.id.clone(), trigger));
                        if let Some(trigger) = trigger {
                            registrations.push((
                                device.id.clone(),
                                schedule.id.clone(),
                                selection.effective,
                                trigger,
                            ));
                        }
                    }
                    Resolution::Unresolved(reason) => match schedule.cron {
                        // 临时解析失败不撤掉已有触发，沿用上一轮描述符
                        Some(previous) => {
                            warn!(
                                device_id = %device.id,
                                schedule_id = %schedule.id,
                                reason = ?reason,
                                "Resolution failed, keeping previous trigger"
                            );
                            registrations.push((
                                device.id.clone(),
                                schedule.id.clone(),
                                selection.effective,
                                previous,
                            ));
                        }
                        // 从未解析成功过：预期的引导状态，无触发
                        None => debug!(
                            device_id = %device.id,
                            schedule_id = %schedule.id,
                            reason = ?reason,
                            "Never resolved, no trigger registered"
                        ),
                    },
                }
            }
        }

        let occupied: Vec<u8> = registrations
            .iter()
            .filter(|(_, _, _, t)| t.hour == config.refresh_hour)
            .map(|(_, _, _, t)| t.minute)
            .collect();
        let (refresh_minute, fallback) =
            pick_free_minute(&occupied, config.default_refresh_minute);
        if fallback {
            warn!(
                hour = %config.refresh_hour,
                minute = %refresh_minute,
                "Refresh hour fully occupied, colliding trigger may be skipped today"
            );
        }

        let scheduler_guard = self.scheduler.read().await;
        let scheduler = scheduler_guard
            .as_ref()
            .ok_or(EngineError::SchedulerNotStarted)?;

        // 注销旧的一套，避免编辑反复叠加出重复触发
        {
            let mut jobs = self.trigger_jobs.write().await;
            for uuid in jobs.drain(..) {
                scheduler.remove(&uuid).await?;
            }
        }
        if let Some(uuid) = self.refresh_job.write().await.take() {
            scheduler.remove(&uuid).await?;
        }

        let mut new_jobs = Vec::with_capacity(registrations.len());
        let trigger_count = registrations.len();
        for (device_id, schedule_id, effective, trigger) in registrations {
            let inner = Arc::clone(self);
            let cron = trigger.to_cron();
            // 描述符按本地墙钟时间编译，注册也必须用本地时区，
            // 默认的 UTC 会让触发整体偏移一个时区差
            let job = Job::new_async_tz(cron.as_str(), Local, move |_uuid, _lock| {
                let inner = inner.clone();
                let device_id = device_id.clone();
                let schedule_id = schedule_id.clone();
                let effective = effective.clone();
                Box::pin(async move {
                    inner.handle_fire(&device_id, &schedule_id, &effective).await;
                })
            })?;
            new_jobs.push(scheduler.add(job).await?);
        }
        *self.trigger_jobs.write().await = new_jobs;

        // 每日刷新自身也是一个触发，排进选出的空闲分钟
        let refresh_cron = format!("0 {} {} * * *", refresh_minute, config.refresh_hour);
        let inner = Arc::clone(self);
        let refresh_job = Job::new_async_tz(refresh_cron.as_str(), Local, move |_uuid, _lock| {
            let inner = inner.clone();
            Box::pin(async move {
                if let Err(e) = inner.refresh_boxed().await {
                    error!(error = %e, "Daily refresh failed");
                }
            })
        })?;
        *self.refresh_job.write().await = Some(scheduler.add(refresh_job).await?);
        drop(scheduler_guard);

        self.store.apply_compiled(&updates).await;

        // 重新登记引用的变量集合
        if let Err(e) = self.variables.clear_in_use().await {
            warn!(error = %e, "Variable in-use clear failed");
        }
        for name in self.store.variable_names().await {
            if let Err(e) = self.variables.mark_in_use(&name).await {
                warn!(variable = %name, error = %e, "Variable in-use registration failed");
            }
        }

        info!(
            triggers = %trigger_count,
            refresh_minute = %refresh_minute,
            "Refresh pass complete"
        );
        Ok(())
    }

    /// 每日刷新回调专用的装箱入口
    ///
    /// 刷新 pass 自己注册每日刷新任务，回调若直接 await refresh 的
    /// 匿名 future 会形成自引用类型，编译器无法判定 Send。装箱一层
    /// 把递归边切成 trait object。
    fn refresh_boxed(self: Arc<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move { self.refresh().await })
    }

    /// 触发回调：门限判定后分发设备动作
    async fn handle_fire(&self, device_id: &str, schedule_id: &str, effective: &TimeSpec) {
        let config = self.config.read().await.clone();
        let today = Local::now().date_naive();

        let device = match self.store.get(device_id).await {
            Ok(device) => device,
            Err(e) => {
                error!(device_id = %device_id, error = %e, "Fired trigger for unknown device");
                return;
            }
        };
        let Some(schedule) = device.schedule(schedule_id) else {
            warn!(device_id = %device_id, schedule_id = %schedule_id, "Fired trigger for removed schedule");
            return;
        };

        let decision = gate::evaluate(
            schedule,
            effective,
            today,
            &config,
            &*self.mode,
            self.switch.as_deref(),
            &*self.variables,
        )
        .await;
        match decision {
            GateDecision::Proceed => {
                if let Err(e) =
                    dispatch::execute(&device, schedule, &*self.gateway, &config).await
                {
                    error!(
                        device_id = %device_id,
                        schedule_id = %schedule_id,
                        error = %e,
                        "Scheduled action failed"
                    );
                }
            }
            // 具体原因已在门限内记日志
            GateDecision::Skip(reason) => {
                debug!(schedule_id = %schedule_id, reason = ?reason, "Trigger skipped")
            }
        }
    }

    /// 启动恢复：回放回看窗口内最近一次适用触发
    ///
    /// 全局门限（暂停/模式/激活开关）启动时整体判一次，不逐设备判。
    /// 单台设备回放失败不中断其余设备。
    async fn on_boot(self: &Arc<Self>) -> Result<()> {
        let config = self.config.read().await.clone();
        if !config.restore_on_boot {
            info!("Restore on boot disabled");
            return Ok(());
        }
        if let Some(reason) =
            gate::evaluate_global(&config, &*self.mode, self.switch.as_deref()).await
        {
            info!(reason = ?reason, "Recovery suppressed by global gate");
            return Ok(());
        }

        let now = Local::now().naive_local();
        let devices = self.store.list().await;
        let ctx = self.resolve_context(now.date());
        let actions = restore::plan(&devices, now, &ctx).await;

        for action in actions {
            let Some(device) = devices.iter().find(|d| d.id == action.device_id) else {
                continue;
            };
            let Some(schedule) = device.schedule(&action.schedule_id) else {
                continue;
            };
            info!(
                device_id = %device.id,
                schedule_id = %schedule.id,
                fired_at = %action.fired_at,
                "Replaying most recent firing"
            );
            if let Err(e) = dispatch::execute(device, schedule, &*self.gateway, &config).await {
                error!(device_id = %device.id, error = %e, "Restore failed for device");
            }
        }
        Ok(())
    }
}
