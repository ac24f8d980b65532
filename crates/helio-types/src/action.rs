use serde::{Deserialize, Serialize};

/// 设备能力类型
///
/// 在设备实际支持的能力中选择一种，决定日程的哪些动作字段生效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// 开关
    Switch,

    /// 调光器
    Dimmer,

    /// 按键
    Button,
}

/// 目标开关状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    On,
    Off,
}

/// 按键动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// 单击
    Push,

    /// 长按
    Hold,

    /// 双击
    DoubleTap,

    /// 释放
    Release,
}

impl std::fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ButtonAction::Push => "push",
            ButtonAction::Hold => "hold",
            ButtonAction::DoubleTap => "double_tap",
            ButtonAction::Release => "release",
        };
        write!(f, "{}", name)
    }
}
