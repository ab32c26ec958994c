//! 核心层：错误分类、关闭信号、调度状态

pub mod error;
pub mod shutdown;
pub mod state;

pub use error::{BotError, GatewayError};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{CycleReport, ItemTally, SchedulerPhase, WaitKind};
