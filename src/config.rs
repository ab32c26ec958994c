//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MEGABOT__*` 覆盖（双下划线表示嵌套，如 `MEGABOT__SCHEDULE__SHORT_WAIT_SECS=30`）。
//! 所有字段都有默认值，缺少配置文件时也能直接运行。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::BotError;
use crate::model::Category;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSection,
    pub collection: CollectionSection,
    pub retry: RetrySection,
    pub missions: MissionsSection,
    pub schedule: ScheduleSection,
}

/// [api] 段：服务端地址、请求超时、凭据文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub referer: String,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    pub token_file: PathBuf,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "https://api-dev.megai.city".to_string(),
            referer: "https://game-test.megai.city/".to_string(),
            request_timeout_secs: 30,
            token_file: PathBuf::from("token.txt"),
        }
    }
}

/// [collection] 段：房间数、能量门槛、单次采集消耗、节奏
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionSection {
    pub rooms: u32,
    /// 低于该能量时不再发起采集
    pub min_energy_threshold: u32,
    /// 每次成功采集在本地扣减的能量
    pub collect_cost: u32,
    /// 参与采集的物品类别（启动时两类都会拉取并展示）
    pub categories: Vec<Category>,
    pub room_delay_ms: u64,
    pub item_delay_ms: u64,
    /// 每个物品扫完所有房间后是否刷新一次任务进度
    pub refresh_missions_per_item: bool,
}

impl Default for CollectionSection {
    fn default() -> Self {
        Self {
            rooms: 12,
            min_energy_threshold: 25,
            collect_cost: 25,
            categories: vec![Category::RawMaterial],
            room_delay_ms: 100,
            item_delay_ms: 300,
            refresh_missions_per_item: true,
        }
    }
}

/// [retry] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

/// [missions] 段：跟踪的任务 ID
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionsSection {
    pub ids: Vec<u64>,
}

impl Default for MissionsSection {
    fn default() -> Self {
        Self { ids: vec![780, 790] }
    }
}

/// [schedule] 段：两轮之间的等待
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub short_wait_secs: u64,
    /// 能量耗尽后的恢复等待
    pub long_wait_secs: u64,
    /// 倒计时轮询间隔
    pub tick_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            short_wait_secs: 60,
            long_wait_secs: 300,
            tick_secs: 1,
        }
    }
}

impl ScheduleSection {
    pub fn short_wait(&self) -> Duration {
        Duration::from_secs(self.short_wait_secs)
    }

    pub fn long_wait(&self) -> Duration {
        Duration::from_secs(self.long_wait_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}

impl AppConfig {
    /// 拒绝无法运行的取值
    pub fn validate(&self) -> Result<(), BotError> {
        if self.collection.rooms == 0 {
            return Err(BotError::Config("collection.rooms must be at least 1".into()));
        }
        if self.collection.categories.is_empty() {
            return Err(BotError::Config("collection.categories must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(BotError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.missions.ids.is_empty() {
            return Err(BotError::Config("missions.ids must not be empty".into()));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 MEGABOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MEGABOT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, BotError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MEGABOT")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
