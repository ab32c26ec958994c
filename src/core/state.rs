//! 调度状态与每轮报告
//!
//! SchedulerPhase 是循环调度器的状态机；CycleReport 是一轮结束后的汇总，供日志与测试使用。

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/// 调度器阶段：Idle → Running → (WaitingShort | WaitingLong) → Running → … → Stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SchedulerPhase {
    Idle,
    Running,
    WaitingShort,
    WaitingLong,
    /// 终态，不再恢复
    Stopped,
}

/// 两轮之间的等待类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WaitKind {
    /// 常规间隔
    Short,
    /// 能量耗尽，等待恢复
    Long,
}

impl WaitKind {
    pub fn phase(self) -> SchedulerPhase {
        match self {
            WaitKind::Short => SchedulerPhase::WaitingShort,
            WaitKind::Long => SchedulerPhase::WaitingLong,
        }
    }
}

/// 单个物品在本轮的采集次数
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemTally {
    pub item_id: u64,
    pub name: String,
    pub collected: u32,
}

/// 一轮（采集 + 任务刷新 + 完成尝试）的汇总
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Local>,
    pub collected: u32,
    pub per_item: Vec<ItemTally>,
    pub insufficient_energy: bool,
    pub energy_after: u32,
    pub missions_seen: usize,
    pub missions_completed: Vec<u64>,
    pub next_wait: WaitKind,
    #[serde(skip)]
    pub wait_duration: Duration,
}
