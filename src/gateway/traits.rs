//! 远端动作网关抽象
//!
//! 所有后端（HTTP / Mock）实现 GameGateway；引擎只依赖该 trait，不关心请求头与传输细节。

use async_trait::async_trait;

use crate::core::GatewayError;
use crate::model::{Category, EnergyReading, Fetch, Item, Mission, RoomId};

/// 游戏服务端暴露的五个动作；支持条件请求的动作接收上次的再验证令牌
#[async_trait]
pub trait GameGateway: Send + Sync {
    async fn get_energy(&self, token: Option<&str>) -> Result<Fetch<EnergyReading>, GatewayError>;

    async fn list_items(&self, category: Category) -> Result<Vec<Item>, GatewayError>;

    /// 成功即 Ok(())；服务端明确拒绝返回 GatewayError::Rejected
    async fn collect_item(&self, item_id: u64, room_id: RoomId) -> Result<(), GatewayError>;

    async fn mission_progress(
        &self,
        mission_id: u64,
        token: Option<&str>,
    ) -> Result<Fetch<Mission>, GatewayError>;

    async fn complete_mission(&self, mission_id: u64) -> Result<(), GatewayError>;
}
