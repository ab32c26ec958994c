//! 远端动作网关：trait 抽象与实现（HTTP / Mock）

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpGateway;
pub use mock::{Call, MockGateway};
pub use traits::GameGateway;
