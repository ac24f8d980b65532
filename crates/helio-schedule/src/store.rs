use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use helio_types::Capability;

use crate::compile::RecurringTrigger;
use crate::error::{Result, ScheduleError};
use crate::model::{Device, Schedule};

/// 设备-日程集合存储（内存实现）
///
/// 写入只来自配置编辑路径和周期刷新回写；触发执行路径只读。
/// 持久化委托给宿主的键值设施，经 `snapshot`/`restore_snapshot` 往返。
pub struct ScheduleStore {
    devices: Arc<RwLock<HashMap<String, Device>>>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 纳管新设备，自动生成一条默认日程
    pub async fn add_device(&self, name: impl Into<String>, capability: Capability) -> Device {
        let device = Device::new(name, capability);
        let mut devices = self.devices.write().await;
        devices.insert(device.id.clone(), device.clone());
        info!(device_id = %device.id, name = %device.name, "Device added");
        device
    }

    /// 按 ID 取设备
    pub async fn get(&self, device_id: &str) -> Result<Device> {
        let devices = self.devices.read().await;
        devices
            .get(device_id)
            .cloned()
            .ok_or_else(|| ScheduleError::DeviceNotFound(device_id.to_string()))
    }

    /// 取消纳管，级联删除其全部日程
    pub async fn remove_device(&self, device_id: &str) -> Result<()> {
        let mut devices = self.devices.write().await;
        devices
            .remove(device_id)
            .ok_or_else(|| ScheduleError::DeviceNotFound(device_id.to_string()))?;
        info!(device_id = %device_id, "Device removed");
        Ok(())
    }

    /// 列出全部设备
    ///
    /// 显示顺序在此重算：设备按其最早的已编译触发时刻排序并重编
    /// `zone`，每台设备的日程也按触发时刻排序（未编译的排后，保持
    /// 插入序）。存储内部始终保持插入序。
    pub async fn list(&self) -> Vec<Device> {
        let devices = self.devices.read().await;
        let mut listed: Vec<Device> = devices.values().cloned().collect();

        fn sort_key(trigger: &Option<RecurringTrigger>) -> (u8, u8, u8) {
            match trigger {
                Some(t) => (0, t.hour, t.minute),
                None => (1, 0, 0),
            }
        }

        for device in &mut listed {
            device.schedules.sort_by_key(|s| sort_key(&s.cron));
        }
        listed.sort_by(|a, b| {
            let ka = a.schedules.first().map(|s| sort_key(&s.cron));
            let kb = b.schedules.first().map(|s| sort_key(&s.cron));
            ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
        });
        for (index, device) in listed.iter_mut().enumerate() {
            device.zone = index as u32 + 1;
        }
        listed
    }

    /// 给设备追加一条默认日程
    pub async fn add_schedule(&self, device_id: &str) -> Result<Schedule> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| ScheduleError::DeviceNotFound(device_id.to_string()))?;
        let schedule = Schedule::default();
        device.schedules.push(schedule.clone());
        info!(device_id = %device_id, schedule_id = %schedule.id, "Schedule added");
        Ok(schedule)
    }

    /// 删除日程
    ///
    /// 设备永远保有至少一条日程：删掉最后一条时补回一条默认日程。
    pub async fn remove_schedule(&self, device_id: &str, schedule_id: &str) -> Result<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| ScheduleError::DeviceNotFound(device_id.to_string()))?;
        let before = device.schedules.len();
        device.schedules.retain(|s| s.id != schedule_id);
        if device.schedules.len() == before {
            return Err(ScheduleError::ScheduleNotFound(schedule_id.to_string()));
        }
        if device.schedules.is_empty() {
            let replacement = Schedule::default();
            debug!(device_id = %device_id, schedule_id = %replacement.id, "Last schedule removed, default regenerated");
            device.schedules.push(replacement);
        }
        info!(device_id = %device_id, schedule_id = %schedule_id, "Schedule removed");
        Ok(())
    }

    /// 同步应用一次日程编辑，返回更新后的日程
    pub async fn update_schedule<F>(
        &self,
        device_id: &str,
        schedule_id: &str,
        edit: F,
    ) -> Result<Schedule>
    where
        F: FnOnce(&mut Schedule),
    {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| ScheduleError::DeviceNotFound(device_id.to_string()))?;
        let schedule = device
            .schedule_mut(schedule_id)
            .ok_or_else(|| ScheduleError::ScheduleNotFound(schedule_id.to_string()))?;
        edit(schedule);
        schedule.normalize();
        Ok(schedule.clone())
    }

    /// 一次写锁内回写整批编译结果
    ///
    /// 刷新 pass 先在快照上算出全部新描述符，再经此原子落盘，避免
    /// 触发回调读到半更新状态。
    pub async fn apply_compiled(&self, updates: &[(String, String, Option<RecurringTrigger>)]) {
        let mut devices = self.devices.write().await;
        for (device_id, schedule_id, trigger) in updates {
            if let Some(device) = devices.get_mut(device_id) {
                if let Some(schedule) = device.schedule_mut(schedule_id) {
                    schedule.cron = *trigger;
                }
            }
        }
    }

    /// 变量改名：重写所有引用旧名的时间描述，返回重写条数
    pub async fn rename_variable(&self, old: &str, new: &str) -> usize {
        let mut devices = self.devices.write().await;
        let mut rewritten = 0;
        for device in devices.values_mut() {
            for schedule in &mut device.schedules {
                if schedule.time.rename_variable(old, new) {
                    rewritten += 1;
                }
                if let Some(secondary) = &mut schedule.secondary_time {
                    if secondary.rename_variable(old, new) {
                        rewritten += 1;
                    }
                }
            }
        }
        if rewritten > 0 {
            info!(old = %old, new = %new, count = %rewritten, "Variable renamed across schedules");
        }
        rewritten
    }

    /// 当前被引用的全部变量名（去重）
    pub async fn variable_names(&self) -> Vec<String> {
        let devices = self.devices.read().await;
        let mut names: Vec<String> = devices
            .values()
            .flat_map(|d| d.schedules.iter())
            .flat_map(|s| {
                s.time
                    .variable_name()
                    .into_iter()
                    .chain(s.secondary_time.as_ref().and_then(|t| t.variable_name()))
            })
            .map(|n| n.to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// 导出全量模型快照（交给宿主持久化）
    pub async fn snapshot(&self) -> Result<serde_json::Value> {
        let devices = self.devices.read().await;
        Ok(serde_json::to_value(&*devices)?)
    }

    /// 从宿主读回的快照恢复模型
    ///
    /// 逐设备归一化，旧形态在此一次性升级。
    pub async fn restore_snapshot(&self, snapshot: serde_json::Value) -> Result<usize> {
        let mut loaded: HashMap<String, Device> = serde_json::from_value(snapshot)?;
        for device in loaded.values_mut() {
            device.normalize();
        }
        let count = loaded.len();
        let mut devices = self.devices.write().await;
        *devices = loaded;
        info!(count = %count, "Schedule model restored from snapshot");
        Ok(count)
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeSpec;
    use helio_types::DaySet;

    #[tokio::test]
    async fn test_add_and_get_device() {
        let store = ScheduleStore::new();
        let device = store.add_device("porch light", Capability::Switch).await;
        let fetched = store.get(&device.id).await.unwrap();
        assert_eq!(fetched.name, "porch light");
        assert_eq!(fetched.schedules.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_last_schedule_regenerates_default() {
        let store = ScheduleStore::new();
        let device = store.add_device("lamp", Capability::Dimmer).await;
        let only = device.schedules[0].id.clone();
        store.remove_schedule(&device.id, &only).await.unwrap();

        let fetched = store.get(&device.id).await.unwrap();
        assert_eq!(fetched.schedules.len(), 1);
        assert_ne!(fetched.schedules[0].id, only);
    }

    #[tokio::test]
    async fn test_update_schedule_applies_synchronously() {
        let store = ScheduleStore::new();
        let device = store.add_device("lamp", Capability::Dimmer).await;
        let schedule_id = device.schedules[0].id.clone();

        let updated = store
            .update_schedule(&device.id, &schedule_id, |s| s.desired_level = 250)
            .await
            .unwrap();
        // normalize 收敛亮度
        assert_eq!(updated.desired_level, 100);
    }

    #[tokio::test]
    async fn test_rename_variable_rewrites_all_references() {
        let store = ScheduleStore::new();
        let device = store.add_device("blinds", Capability::Switch).await;
        let schedule_id = device.schedules[0].id.clone();
        store
            .update_schedule(&device.id, &schedule_id, |s| {
                s.time = TimeSpec::Variable {
                    name: "wake_up".to_string(),
                    offset_minutes: 0,
                };
            })
            .await
            .unwrap();

        assert_eq!(store.rename_variable("wake_up", "alarm").await, 1);
        assert_eq!(store.variable_names().await, vec!["alarm".to_string()]);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let store = ScheduleStore::new();
        let device = store.add_device("fan", Capability::Switch).await;
        let snapshot = store.snapshot().await.unwrap();

        let restored = ScheduleStore::new();
        assert_eq!(restored.restore_snapshot(snapshot).await.unwrap(), 1);
        let fetched = restored.get(&device.id).await.unwrap();
        assert_eq!(fetched.name, "fan");
    }

    #[tokio::test]
    async fn test_list_recomputes_zones_by_trigger_time() {
        let store = ScheduleStore::new();
        let late = store.add_device("evening", Capability::Switch).await;
        let early = store.add_device("morning", Capability::Switch).await;

        store
            .apply_compiled(&[
                (
                    late.id.clone(),
                    late.schedules[0].id.clone(),
                    Some(RecurringTrigger {
                        minute: 0,
                        hour: 20,
                        days: DaySet::ALL,
                    }),
                ),
                (
                    early.id.clone(),
                    early.schedules[0].id.clone(),
                    Some(RecurringTrigger {
                        minute: 30,
                        hour: 6,
                        days: DaySet::ALL,
                    }),
                ),
            ])
            .await;

        let listed = store.list().await;
        assert_eq!(listed[0].name, "morning");
        assert_eq!(listed[0].zone, 1);
        assert_eq!(listed[1].name, "evening");
        assert_eq!(listed[1].zone, 2);
    }
}
