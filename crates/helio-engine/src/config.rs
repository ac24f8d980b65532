use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// 激活开关门限的期望状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchExpectation {
    /// 外部开关须处于的状态（true 为开）
    pub expect_on: bool,
}

/// 引擎配置快照
///
/// 每轮评估开始时整体捕获并以不可变引用传入门限/分发逻辑，
/// 不在回调里读环境全局。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 全局暂停：置位后任何触发一律不执行
    pub pause_all: bool,

    /// 模式白名单（None 表示不启用模式门限）
    pub allowed_modes: Option<Vec<String>>,

    /// 激活开关门限（None 表示不启用）
    pub activation_switch: Option<SwitchExpectation>,

    /// 调光前先发一次普通"开"命令（部分设备不在开启状态下会忽略调光）
    pub on_before_level: bool,

    /// 每日刷新所在小时
    pub refresh_hour: u8,

    /// 刷新小时整点被占满时的兜底分钟
    pub default_refresh_minute: u8,

    /// 重启后是否执行恢复回放
    pub restore_on_boot: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pause_all: false,
            allowed_modes: None,
            activation_switch: None,
            on_before_level: false,
            refresh_hour: 1,
            default_refresh_minute: 0,
            restore_on_boot: true,
        }
    }
}

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// 加载引擎配置
    ///
    /// 配置文件不存在时返回默认配置。
    pub fn load(&self) -> Result<EngineConfig> {
        let config_path = self.config_dir.join("engine.toml");

        if !config_path.exists() {
            return Ok(EngineConfig::default());
        }

        let path = config_path.to_string_lossy();
        let config = Config::builder()
            .add_source(File::new(path.as_ref(), FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
