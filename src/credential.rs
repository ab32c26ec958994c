//! 凭据：启动时从本地文件读取一次 Bearer token，缺失即致命

use std::path::Path;

use crate::core::BotError;

pub fn load_token(path: &Path) -> Result<String, BotError> {
    let raw = std::fs::read_to_string(path).map_err(|e| BotError::MissingCredential {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(BotError::MissingCredential {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    tracing::info!("Token loaded successfully");
    Ok(token.to_string())
}
