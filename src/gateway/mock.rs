//! Mock 网关（用于测试与离线演练，无需服务端）
//!
//! 每个动作维护一个脚本队列，按调用顺序弹出预设结果；队列为空时回落到默认行为：
//! get-energy / mission-progress 返回 NotModified，collect-item 返回默认结果，mission-complete 成功。
//! 所有调用按顺序记录，便于断言尝试次数与房间顺序。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::GatewayError;
use crate::gateway::GameGateway;
use crate::model::{Category, EnergyReading, Fetch, Item, Mission, RoomId};

/// 一次被记录的网关调用
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetEnergy { token: Option<String> },
    ListItems(Category),
    Collect { item_id: u64, room_id: RoomId },
    MissionProgress { mission_id: u64, token: Option<String> },
    CompleteMission(u64),
}

type Script<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

pub struct MockGateway {
    energy: Script<Fetch<EnergyReading>>,
    items: Mutex<HashMap<Category, Result<Vec<Item>, GatewayError>>>,
    collect: Script<()>,
    collect_default: Mutex<Result<(), GatewayError>>,
    missions: Mutex<HashMap<u64, VecDeque<Result<Fetch<Mission>, GatewayError>>>>,
    complete: Script<()>,
    calls: Mutex<Vec<Call>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            energy: Mutex::new(VecDeque::new()),
            items: Mutex::new(HashMap::new()),
            collect: Mutex::new(VecDeque::new()),
            collect_default: Mutex::new(Err(GatewayError::rejected("NOT_AVAILABLE"))),
            missions: Mutex::new(HashMap::new()),
            complete: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_items(&self, category: Category, items: Result<Vec<Item>, GatewayError>) {
        lock(&self.items).insert(category, items);
    }

    pub fn push_energy(&self, result: Result<Fetch<EnergyReading>, GatewayError>) {
        lock(&self.energy).push_back(result);
    }

    /// 便捷方法：推入一次新鲜的能量读数
    pub fn push_energy_reading(&self, energy: u32, max_energy: u32) {
        self.push_energy(Ok(Fetch::fresh(EnergyReading { energy, max_energy }, None)));
    }

    pub fn push_collect(&self, result: Result<(), GatewayError>) {
        lock(&self.collect).push_back(result);
    }

    /// 脚本耗尽后 collect-item 的返回值
    pub fn set_collect_default(&self, result: Result<(), GatewayError>) {
        *lock(&self.collect_default) = result;
    }

    pub fn push_mission(&self, mission_id: u64, result: Result<Fetch<Mission>, GatewayError>) {
        lock(&self.missions)
            .entry(mission_id)
            .or_default()
            .push_back(result);
    }

    pub fn push_complete(&self, result: Result<(), GatewayError>) {
        lock(&self.complete).push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn collect_calls(&self) -> Vec<(u64, RoomId)> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                Call::Collect { item_id, room_id } => Some((*item_id, *room_id)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

/// Mock 内部锁不会跨 await 持有，中毒时直接沿用内部数据
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl GameGateway for MockGateway {
    async fn get_energy(&self, token: Option<&str>) -> Result<Fetch<EnergyReading>, GatewayError> {
        self.record(Call::GetEnergy {
            token: token.map(String::from),
        });
        let next = lock(&self.energy).pop_front();
        next.unwrap_or(Ok(Fetch::NotModified))
    }

    async fn list_items(&self, category: Category) -> Result<Vec<Item>, GatewayError> {
        self.record(Call::ListItems(category));
        let items = lock(&self.items).get(&category).cloned();
        items.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn collect_item(&self, item_id: u64, room_id: RoomId) -> Result<(), GatewayError> {
        self.record(Call::Collect { item_id, room_id });
        let scripted = lock(&self.collect).pop_front();
        match scripted {
            Some(result) => result,
            None => {
                let fallback = lock(&self.collect_default).clone();
                fallback
            }
        }
    }

    async fn mission_progress(
        &self,
        mission_id: u64,
        token: Option<&str>,
    ) -> Result<Fetch<Mission>, GatewayError> {
        self.record(Call::MissionProgress {
            mission_id,
            token: token.map(String::from),
        });
        let next = lock(&self.missions)
            .get_mut(&mission_id)
            .and_then(|q| q.pop_front());
        next.unwrap_or(Ok(Fetch::NotModified))
    }

    async fn complete_mission(&self, mission_id: u64) -> Result<(), GatewayError> {
        self.record(Call::CompleteMission(mission_id));
        let next = lock(&self.complete).pop_front();
        next.unwrap_or(Ok(()))
    }
}
