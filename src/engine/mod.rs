//! 预算循环引擎：能量账本、有界重试、任务缓存、采集驱动、循环调度

pub mod collector;
pub mod energy;
pub mod missions;
pub mod retry;
pub mod scheduler;

pub use collector::{CollectionDriver, CollectionOutcome, CollectionSettings};
pub use energy::{EnergyLedger, EnergyRefresh};
pub use missions::MissionCache;
pub use retry::RetryPolicy;
pub use scheduler::{wait_cancellable, CycleScheduler, Session};
