//! 错误类型
//!
//! GatewayError 描述单次远端调用的失败，并区分可重试（传输/协议）与不可重试（业务拒绝）；
//! BotError 是启动阶段的致命错误与引擎对外的类型化失败。

use std::path::PathBuf;

use thiserror::Error;

/// 单次远端调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 连接失败、超时等网络层错误
    #[error("Transport error: {0}")]
    Transport(String),

    /// 非预期 HTTP 状态或响应体无法解析
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 服务端明确返回非 OK 的 error_code（如「此房间不可采集」）
    #[error("Rejected by server: {code}")]
    Rejected { code: String },
}

impl GatewayError {
    pub fn rejected(code: impl Into<String>) -> Self {
        GatewayError::Rejected { code: code.into() }
    }

    /// 传输与协议错误可重试；业务拒绝是终态
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Protocol(_))
    }
}

/// 机器人运行错误
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Credential not available at {path}: {reason}")]
    MissingCredential { path: PathBuf, reason: String },

    #[error("Item catalog is empty, nothing to collect")]
    EmptyCatalog,

    #[error("No mission data available (neither fresh nor cached)")]
    NoMissions,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Mission {0} reported not modified but no cached snapshot exists")]
    NotModifiedWithoutCache(u64),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<config::ConfigError> for BotError {
    fn from(e: config::ConfigError) -> Self {
        BotError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Transport("timeout".into()).is_transient());
        assert!(GatewayError::Protocol("HTTP 502".into()).is_transient());
        assert!(!GatewayError::rejected("ITEM_NOT_IN_ROOM").is_transient());
    }

    #[test]
    fn test_gateway_error_converts_into_bot_error() {
        let err: BotError = GatewayError::rejected("NOPE").into();
        assert!(matches!(err, BotError::Gateway(GatewayError::Rejected { .. })));
        assert_eq!(err.to_string(), "Rejected by server: NOPE");
    }
}
