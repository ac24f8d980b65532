use tracing::{error, info, warn};

use helio_schedule::{Device, Schedule};
use helio_types::{Capability, DesiredState};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::gateway::CommandGateway;

/// 执行日程的设备动作
///
/// 纯编排：门限已由调用方通过。命令失败上抛并记日志，不重试，
/// 下一次排定触发即自然重试。
pub async fn execute(
    device: &Device,
    schedule: &Schedule,
    gateway: &dyn CommandGateway,
    config: &EngineConfig,
) -> Result<()> {
    match device.capability {
        Capability::Button => press_button(device, schedule, gateway).await,
        Capability::Dimmer if schedule.desired_state == DesiredState::On => {
            if config.on_before_level {
                command(device, "turn_on", gateway.turn_on(&device.id).await)?;
            }
            command(
                device,
                "set_level",
                gateway.set_level(&device.id, schedule.desired_level).await,
            )?;
            info!(device_id = %device.id, level = %schedule.desired_level, "Dimmer level set");
            Ok(())
        }
        _ => match schedule.desired_state {
            DesiredState::On => {
                command(device, "turn_on", gateway.turn_on(&device.id).await)?;
                info!(device_id = %device.id, "Device turned on");
                Ok(())
            }
            DesiredState::Off => {
                command(device, "turn_off", gateway.turn_off(&device.id).await)?;
                info!(device_id = %device.id, "Device turned off");
                Ok(())
            }
        },
    }
}

async fn press_button(
    device: &Device,
    schedule: &Schedule,
    gateway: &dyn CommandGateway,
) -> Result<()> {
    let action = match schedule.button_action {
        Some(action) => action,
        None => {
            // 配置缺口：无动作可发，记错并空操作
            error!(device_id = %device.id, schedule_id = %schedule.id, "Button action not configured");
            return Ok(());
        }
    };

    match gateway.supported_button_actions(&device.id).await {
        Ok(supported) if !supported.is_empty() && !supported.contains(&action) => {
            error!(
                device_id = %device.id,
                action = %action,
                "Button action not supported by device"
            );
            return Ok(());
        }
        Err(e) => {
            warn!(device_id = %device.id, error = %e, "Could not read supported button actions");
        }
        Ok(_) => {}
    }

    command(
        device,
        "press_button",
        gateway
            .press_button(&device.id, action, schedule.button_number)
            .await,
    )?;
    info!(
        device_id = %device.id,
        action = %action,
        number = %schedule.button_number,
        "Button action sent"
    );
    Ok(())
}

fn command(
    device: &Device,
    name: &str,
    outcome: std::result::Result<(), anyhow::Error>,
) -> Result<()> {
    outcome.map_err(|e| {
        error!(device_id = %device.id, command = %name, error = %e, "Device command failed");
        EngineError::command(format!("{} on {}: {}", name, device.id, e))
    })
}
