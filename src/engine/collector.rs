//! 采集驱动：物品 × 房间的有界串行扫描
//!
//! 物品按目录顺序、房间按 ID 升序依次尝试；每次尝试前检查能量门槛与停止信号。
//! 单个房间失败不影响其它房间，某物品本轮零收获是常态而非错误。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::CollectionSection;
use crate::core::ItemTally;
use crate::engine::{EnergyLedger, MissionCache, RetryPolicy};
use crate::gateway::GameGateway;
use crate::model::{Item, RoomId};

/// 采集参数（由 [collection] 段派生）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSettings {
    pub min_energy_threshold: u32,
    pub collect_cost: u32,
    pub room_delay: Duration,
    pub item_delay: Duration,
    pub refresh_missions_per_item: bool,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self::from(&CollectionSection::default())
    }
}

impl From<&CollectionSection> for CollectionSettings {
    fn from(section: &CollectionSection) -> Self {
        Self {
            min_energy_threshold: section.min_energy_threshold,
            collect_cost: section.collect_cost,
            room_delay: Duration::from_millis(section.room_delay_ms),
            item_delay: Duration::from_millis(section.item_delay_ms),
            refresh_missions_per_item: section.refresh_missions_per_item,
        }
    }
}

impl CollectionSettings {
    /// 当前能量是否足以发起下一次采集：同时满足门槛与单次消耗
    pub fn has_budget(&self, ledger: &EnergyLedger) -> bool {
        ledger.current() >= self.min_energy_threshold && ledger.can_afford(self.collect_cost)
    }
}

/// 一次采集扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOutcome {
    pub collected: u32,
    pub per_item: Vec<ItemTally>,
    /// 开始时能量即低于门槛，未做任何尝试
    pub insufficient_energy: bool,
}

pub struct CollectionDriver<'a, G: ?Sized> {
    gateway: &'a G,
    retry: RetryPolicy,
    settings: &'a CollectionSettings,
}

impl<'a, G> CollectionDriver<'a, G>
where
    G: GameGateway + ?Sized,
{
    pub fn new(gateway: &'a G, retry: RetryPolicy, settings: &'a CollectionSettings) -> Self {
        Self {
            gateway,
            retry,
            settings,
        }
    }

    pub async fn run(
        &self,
        ledger: &mut EnergyLedger,
        missions: &mut MissionCache,
        items: &[Item],
        rooms: &[RoomId],
        cancel: &CancellationToken,
    ) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::default();

        if !self.settings.has_budget(ledger) {
            tracing::error!(
                "Insufficient energy ({}/{}) to start collection cycle",
                ledger.current(),
                ledger.max()
            );
            outcome.insufficient_energy = true;
            return outcome;
        }

        tracing::info!(
            "Starting collection cycle for {} items across {} rooms...",
            items.len(),
            rooms.len()
        );

        for item in items {
            if cancel.is_cancelled() {
                tracing::info!("Stop requested, leaving collection early");
                break;
            }
            if !self.settings.has_budget(ledger) {
                tracing::warn!(
                    "Insufficient energy ({}/{}) to continue collecting",
                    ledger.current(),
                    ledger.max()
                );
                break;
            }

            let collected = self.sweep_item(ledger, item, rooms, cancel).await;
            outcome.collected += collected;
            outcome.per_item.push(ItemTally {
                item_id: item.id,
                name: item.name.clone(),
                collected,
            });

            // 停止信号出现后只让当前房间尝试收尾，不再发起任务刷新
            if cancel.is_cancelled() {
                tracing::info!("Stop requested, leaving collection early");
                break;
            }

            // 物品之间刷新一次，保持任务进度大致最新
            if self.settings.refresh_missions_per_item {
                missions.refresh_all(self.gateway, &self.retry).await;
            }
            pause(self.settings.item_delay).await;
        }

        tracing::info!(
            "Collection cycle completed. Total items collected: {}",
            outcome.collected
        );
        outcome
    }

    /// 对单个物品扫描所有房间，返回成功次数
    async fn sweep_item(
        &self,
        ledger: &mut EnergyLedger,
        item: &Item,
        rooms: &[RoomId],
        cancel: &CancellationToken,
    ) -> u32 {
        tracing::info!("Attempting to collect {} (ID: {}) from all rooms...", item.name, item.id);
        let mut successes = 0;

        for &room_id in rooms {
            if cancel.is_cancelled() {
                break;
            }
            if !self.settings.has_budget(ledger) {
                tracing::warn!(
                    "Insufficient energy ({}/{}) to collect {} in room {}",
                    ledger.current(),
                    ledger.max(),
                    item.name,
                    room_id
                );
                break;
            }

            let label = format!("collect {} in room {}", item.name, room_id);
            match self
                .retry
                .run(&label, || self.gateway.collect_item(item.id, room_id))
                .await
            {
                Ok(()) => {
                    ledger.spend(self.settings.collect_cost);
                    successes += 1;
                    tracing::info!("Collected {} from room {}", item.name, room_id);
                }
                Err(e) => {
                    tracing::warn!("Failed to collect {} from room {}: {}", item.name, room_id, e);
                }
            }
            pause(self.settings.room_delay).await;
        }

        if successes > 0 {
            tracing::info!("{}: Collected {} times from different rooms", item.name, successes);
        } else {
            tracing::warn!("{}: Not collected from any room", item.name);
        }
        successes
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GatewayError;
    use crate::gateway::{Call, MockGateway};
    use crate::model::Category;

    fn settings() -> CollectionSettings {
        CollectionSettings {
            min_energy_threshold: 25,
            collect_cost: 25,
            room_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            refresh_missions_per_item: false,
        }
    }

    fn item(id: u64) -> Item {
        Item {
            id,
            name: format!("Item {}", id),
            category: Category::RawMaterial,
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_below_threshold_makes_no_attempts() {
        let gw = MockGateway::new();
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        for energy in [0, 1, 24] {
            let mut ledger = EnergyLedger::new(energy, 1500);
            let mut missions = MissionCache::new(vec![780]);
            let outcome = driver
                .run(&mut ledger, &mut missions, &[item(1)], &[1, 2, 3], &CancellationToken::new())
                .await;
            assert_eq!(outcome.collected, 0);
            assert!(outcome.insufficient_energy);
        }
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_energy_exhausted_mid_item_skips_remaining_rooms() {
        let gw = MockGateway::new();
        gw.set_collect_default(Ok(()));
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(30, 1500);
        let mut missions = MissionCache::new(vec![780]);

        let outcome = driver
            .run(&mut ledger, &mut missions, &[item(1)], &[1, 2, 3], &CancellationToken::new())
            .await;

        assert_eq!(outcome.collected, 1);
        assert_eq!(ledger.current(), 5);
        assert_eq!(gw.collect_calls(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_room_failure_does_not_block_other_rooms() {
        let gw = MockGateway::new();
        gw.push_collect(Err(GatewayError::rejected("NOT_HERE")));
        gw.push_collect(Ok(()));
        gw.push_collect(Err(GatewayError::rejected("NOT_HERE")));
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(1000, 1500);
        let mut missions = MissionCache::new(vec![780]);

        let outcome = driver
            .run(&mut ledger, &mut missions, &[item(7)], &[1, 2, 3], &CancellationToken::new())
            .await;

        assert_eq!(outcome.collected, 1);
        assert_eq!(outcome.per_item[0].collected, 1);
        assert_eq!(ledger.current(), 975);
        assert_eq!(gw.collect_calls(), vec![(7, 1), (7, 2), (7, 3)]);
    }

    #[tokio::test]
    async fn test_items_in_catalog_order_rooms_ascending() {
        let gw = MockGateway::new();
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(1000, 1500);
        let mut missions = MissionCache::new(vec![780]);

        let outcome = driver
            .run(&mut ledger, &mut missions, &[item(9), item(3)], &[1, 2], &CancellationToken::new())
            .await;

        assert_eq!(outcome.collected, 0);
        assert_eq!(gw.collect_calls(), vec![(9, 1), (9, 2), (3, 1), (3, 2)]);
        assert_eq!(ledger.current(), 1000);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_per_room() {
        let gw = MockGateway::new();
        gw.push_collect(Err(GatewayError::Transport("timeout".into())));
        gw.push_collect(Err(GatewayError::Transport("timeout".into())));
        gw.push_collect(Ok(()));
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(50, 1500);
        let mut missions = MissionCache::new(vec![780]);

        let outcome = driver
            .run(&mut ledger, &mut missions, &[item(1)], &[1], &CancellationToken::new())
            .await;

        assert_eq!(outcome.collected, 1);
        assert_eq!(gw.collect_calls(), vec![(1, 1), (1, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn test_mission_refresh_after_each_item_sweep() {
        let gw = MockGateway::new();
        let mut settings = settings();
        settings.refresh_missions_per_item = true;
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(1000, 1500);
        let mut missions = MissionCache::new(vec![780]);

        driver
            .run(&mut ledger, &mut missions, &[item(1), item(2)], &[1], &CancellationToken::new())
            .await;

        let refreshes = gw.count(|c| matches!(c, Call::MissionProgress { .. }));
        assert_eq!(refreshes, 2);
    }

    #[tokio::test]
    async fn test_cancelled_token_starts_no_new_work() {
        let gw = MockGateway::new();
        let settings = settings();
        let driver = CollectionDriver::new(&gw, retry(), &settings);
        let mut ledger = EnergyLedger::new(1000, 1500);
        let mut missions = MissionCache::new(vec![780]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = driver
            .run(&mut ledger, &mut missions, &[item(1)], &[1, 2], &cancel)
            .await;
        assert_eq!(outcome.collected, 0);
        assert!(gw.collect_calls().is_empty());
    }
}
