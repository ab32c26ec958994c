//! 循环调度器
//!
//! 状态机 Idle → Running → (WaitingShort | WaitingLong) → Running → … → Stopped。
//! 每轮：刷新能量 → 采集扫描 → 刷新全部任务 → 对可完成的任务提交完成；
//! 本轮零收获且能量不足以发起下一次采集时进入长等待（等能量恢复），否则短等待。
//! 停止信号出现后，当前房间尝试收尾，之后不再发起新的网关调用。
//! 会话状态（能量账本、任务缓存、目录）由调度器独占。

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, ScheduleSection};
use crate::core::{BotError, CycleReport, SchedulerPhase, WaitKind};
use crate::engine::{
    CollectionDriver, CollectionSettings, EnergyLedger, EnergyRefresh, MissionCache, RetryPolicy,
};
use crate::gateway::GameGateway;
use crate::model::{room_range, Category, Item, RoomId};

/// 调度器独占的会话状态
#[derive(Debug, Default)]
pub struct Session {
    pub ledger: EnergyLedger,
    pub missions: MissionCache,
    /// 参与采集的物品（目录顺序）
    pub catalog: Vec<Item>,
    pub rooms: Vec<RoomId>,
    /// 已开始的轮数
    pub cycle: u64,
}

pub struct CycleScheduler {
    gateway: Arc<dyn GameGateway>,
    retry: RetryPolicy,
    collection: CollectionSettings,
    schedule: ScheduleSection,
    categories: Vec<Category>,
    session: Session,
    phase: SchedulerPhase,
}

impl CycleScheduler {
    pub fn new(gateway: Arc<dyn GameGateway>, config: &AppConfig) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::from(&config.retry),
            collection: CollectionSettings::from(&config.collection),
            schedule: config.schedule.clone(),
            categories: config.collection.categories.clone(),
            session: Session {
                missions: MissionCache::new(config.missions.ids.clone()),
                rooms: room_range(config.collection.rooms),
                ..Session::default()
            },
            phase: SchedulerPhase::Idle,
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 启动前置条件：物品目录非空，且至少有一个任务（新鲜或缓存）
    pub async fn startup(&mut self) -> Result<(), BotError> {
        let gateway = Arc::clone(&self.gateway);
        let mut fetched = Vec::new();
        for category in Category::all() {
            tracing::info!("Fetching all available {}s (Type {})...", category, category.type_code());
            let label = format!("list {} items", category);
            match self.retry.run(&label, || gateway.list_items(category)).await {
                Ok(items) => {
                    tracing::info!("Found {} {}s", items.len(), category);
                    for item in &items {
                        tracing::debug!("ID: {} - {}", item.id, item.name);
                    }
                    fetched.extend(items);
                }
                Err(e) => tracing::error!("Failed to get {} items: {}", category, e),
            }
        }

        self.session.catalog = fetched
            .into_iter()
            .filter(|item| self.categories.contains(&item.category))
            .collect();
        if self.session.catalog.is_empty() {
            tracing::error!("No collectable items found. Exiting...");
            return Err(BotError::EmptyCatalog);
        }

        self.refresh_energy().await;

        let missions = self
            .session
            .missions
            .refresh_all(gateway.as_ref(), &self.retry)
            .await;
        if missions.is_empty() && self.session.missions.is_empty() {
            tracing::error!("No active missions found and no cached data. Exiting...");
            return Err(BotError::NoMissions);
        }
        Ok(())
    }

    async fn refresh_energy(&mut self) -> EnergyRefresh {
        tracing::info!("Fetching energy status...");
        let gateway = Arc::clone(&self.gateway);
        let token = self.session.ledger.token().map(String::from);
        let result = self
            .retry
            .run("fetch energy", || gateway.get_energy(token.as_deref()))
            .await;
        self.session.ledger.refresh(result)
    }

    /// 单轮：能量 → 采集 → 任务刷新 → 完成
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        self.session.cycle += 1;
        let cycle = self.session.cycle;
        let started_at = Local::now();
        tracing::info!("========== CYCLE {} START ==========", cycle);

        self.refresh_energy().await;

        let gateway = Arc::clone(&self.gateway);
        let driver = CollectionDriver::new(gateway.as_ref(), self.retry, &self.collection);
        let Session {
            ledger,
            missions,
            catalog,
            rooms,
            ..
        } = &mut self.session;
        let outcome = driver.run(ledger, missions, catalog, rooms, cancel).await;

        // 停止信号出现后不再发起任务刷新与完成
        let snapshots = if cancel.is_cancelled() {
            tracing::info!("Stop requested, skipping mission refresh and completion");
            Vec::new()
        } else {
            missions.refresh_all(gateway.as_ref(), &self.retry).await
        };
        let mut completed = Vec::new();
        for mission in snapshots.iter().filter(|m| m.can_complete_now) {
            if missions
                .complete_mission(gateway.as_ref(), &self.retry, mission.id)
                .await
                .is_ok()
            {
                completed.push(mission.id);
            }
        }

        let next_wait = self.next_wait(outcome.collected);
        let report = CycleReport {
            cycle,
            started_at,
            collected: outcome.collected,
            per_item: outcome.per_item,
            insufficient_energy: outcome.insufficient_energy,
            energy_after: self.session.ledger.current(),
            missions_seen: snapshots.len(),
            missions_completed: completed,
            next_wait,
            wait_duration: self.wait_duration(next_wait),
        };
        tracing::info!("========== CYCLE {} COMPLETE ==========", cycle);
        tracing::info!(
            "Items collected this cycle: {} (energy {}/{}, missions completed: {})",
            report.collected,
            report.energy_after,
            self.session.ledger.max(),
            report.missions_completed.len()
        );
        report
    }

    /// 零收获且能量不足以发起下一次采集 → 长等待；否则短等待
    pub fn next_wait(&self, collected: u32) -> WaitKind {
        if collected == 0 && !self.collection.has_budget(&self.session.ledger) {
            WaitKind::Long
        } else {
            WaitKind::Short
        }
    }

    fn wait_duration(&self, kind: WaitKind) -> Duration {
        match kind {
            WaitKind::Short => self.schedule.short_wait(),
            WaitKind::Long => self.schedule.long_wait(),
        }
    }

    /// 主循环：启动检查通过后一直运行，直到收到停止信号；返回已执行的轮数
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<u64, BotError> {
        if let Err(e) = self.startup().await {
            self.phase = SchedulerPhase::Stopped;
            return Err(e);
        }
        tracing::info!("Starting continuous collection loop...");

        while !cancel.is_cancelled() {
            self.phase = SchedulerPhase::Running;
            let report = self.run_cycle(&cancel).await;
            if cancel.is_cancelled() {
                break;
            }

            self.phase = report.next_wait.phase();
            match report.next_wait {
                WaitKind::Long => tracing::info!(
                    "Energy depleted. Waiting {}s for energy regeneration...",
                    report.wait_duration.as_secs()
                ),
                WaitKind::Short => tracing::info!(
                    "Waiting {}s before next cycle...",
                    report.wait_duration.as_secs()
                ),
            }
            if !wait_cancellable(report.wait_duration, self.schedule.tick(), &cancel).await {
                break;
            }
        }

        self.phase = SchedulerPhase::Stopped;
        tracing::info!("Bot stopped gracefully.");
        Ok(self.session.cycle)
    }
}

/// 可取消的倒计时；按 tick 递减并在每个 tick 输出剩余秒数。
/// 等满返回 true，收到停止信号立即返回 false。
pub async fn wait_cancellable(total: Duration, tick: Duration, cancel: &CancellationToken) -> bool {
    let mut remaining = total;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if remaining.is_zero() {
            return true;
        }
        let step = remaining.min(tick);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(step) => {
                remaining = remaining.saturating_sub(step);
                tracing::debug!("Next cycle in: {}s", remaining.as_secs());
            }
        }
    }
}
