use async_trait::async_trait;

use helio_types::{ButtonAction, DesiredState};

/// 设备命令网关
///
/// 宿主平台的设备命令接口，按设备 ID 寻址。所有调用由网关自身
/// 限定超时，本引擎不做重试。
#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// 开
    async fn turn_on(&self, device_id: &str) -> Result<(), anyhow::Error>;

    /// 关
    async fn turn_off(&self, device_id: &str) -> Result<(), anyhow::Error>;

    /// 设置亮度（0-100）
    async fn set_level(&self, device_id: &str, level: u8) -> Result<(), anyhow::Error>;

    /// 触发按键动作
    async fn press_button(
        &self,
        device_id: &str,
        action: ButtonAction,
        number: u16,
    ) -> Result<(), anyhow::Error>;

    /// 当前开关状态（只读）
    async fn current_state(&self, device_id: &str) -> Result<DesiredState, anyhow::Error>;

    /// 当前亮度（只读）
    async fn current_level(&self, device_id: &str) -> Result<u8, anyhow::Error>;

    /// 设备支持的按键动作（只读，空表示未知）
    async fn supported_button_actions(
        &self,
        device_id: &str,
    ) -> Result<Vec<ButtonAction>, anyhow::Error>;
}

/// 全局模式源（只读）
#[async_trait]
pub trait ModeSource: Send + Sync {
    async fn current_mode(&self) -> Result<String, anyhow::Error>;
}

/// 激活开关状态源（只读，宿主绑定具体开关）
#[async_trait]
pub trait SwitchSource: Send + Sync {
    async fn is_on(&self) -> Result<bool, anyhow::Error>;
}
