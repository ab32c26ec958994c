//! MegaBot - MEGA AI 测试网自动采集机器人
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、优雅关闭、调度状态与每轮报告
//! - **credential**: 启动时读取 Bearer token
//! - **engine**: 能量账本、有界重试、任务缓存、采集驱动、循环调度
//! - **gateway**: 远端动作网关抽象与实现（HTTP / Mock）
//! - **model**: 物品、房间、能量、任务等领域数据
//! - **observability**: 日志初始化

pub mod config;
pub mod core;
pub mod credential;
pub mod engine;
pub mod gateway;
pub mod model;
pub mod observability;

pub use engine::CycleScheduler;
