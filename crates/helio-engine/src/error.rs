use thiserror::Error;

use helio_schedule::ScheduleError;

/// 调度运行时错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 调度器尚未启动
    #[error("Scheduler not started")]
    SchedulerNotStarted,

    /// 日程模型错误
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// 外部调度原语错误
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    /// 设备命令失败（不重试，下次触发即自然重试）
    #[error("Device command failed: {0}")]
    Command(String),

    /// 配置加载错误
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 调度运行时结果类型
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// 创建设备命令错误
    pub fn command(msg: impl Into<String>) -> Self {
        EngineError::Command(msg.into())
    }
}
