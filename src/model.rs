//! 领域数据：物品目录、房间、能量读数、任务快照与条件请求结果
//!
//! 任务快照字段沿用服务端 JSON 的 camelCase 命名，便于直接反序列化与缓存。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 房间编号（1..=N，固定不变）
pub type RoomId = u32;

/// 物品类别：服务端 items?type=1 / type=2
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RawMaterial,
    Npc,
}

impl Category {
    /// 服务端 type 参数
    pub fn type_code(self) -> u8 {
        match self {
            Category::RawMaterial => 1,
            Category::Npc => 2,
        }
    }

    pub fn all() -> [Category; 2] {
        [Category::RawMaterial, Category::Npc]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::RawMaterial => write!(f, "raw material"),
            Category::Npc => write!(f, "NPC"),
        }
    }
}

/// 可采集物品；启动时拉取一次，之后只读
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub category: Category,
}

/// 固定房间序列 1..=count，升序
pub fn room_range(count: u32) -> Vec<RoomId> {
    (1..=count).collect()
}

/// get-energy 返回的读数
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct EnergyReading {
    pub energy: u32,
    pub max_energy: u32,
}

/// 任务总体进度
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    pub met: u32,
    pub total: u32,
    #[serde(default)]
    pub text: String,
}

/// 单项需求进度
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub item_name: String,
    #[serde(default)]
    pub progress_text: String,
    #[serde(default)]
    pub is_met: bool,
}

/// 服务端任务快照
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(rename = "missionId")]
    pub id: u64,
    #[serde(default)]
    pub description: String,
    pub overall_progress: OverallProgress,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub can_complete_now: bool,
}

/// 条件请求结果：新数据（附带可选的再验证令牌）或「未修改」
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch<T> {
    Fresh { value: T, token: Option<String> },
    NotModified,
}

impl<T> Fetch<T> {
    pub fn fresh(value: T, token: Option<String>) -> Self {
        Fetch::Fresh { value, token }
    }
}
