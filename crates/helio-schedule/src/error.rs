use thiserror::Error;

/// 日程模型错误类型
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// 设备未找到
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// 日程未找到
    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 外部提供方错误
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 日程模型结果类型
pub type Result<T> = std::result::Result<T, ScheduleError>;

impl ScheduleError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        ScheduleError::ValidationError(msg.into())
    }

    /// 创建外部提供方错误
    pub fn provider(msg: impl Into<String>) -> Self {
        ScheduleError::ProviderError(msg.into())
    }
}
