//! MegaBot 入口：初始化日志、加载配置与凭据、创建 HTTP 网关，运行循环调度直到 Ctrl+C。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use megabot::config::load_config;
use megabot::core::ShutdownManager;
use megabot::credential::load_token;
use megabot::gateway::HttpGateway;
use megabot::CycleScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    megabot::observability::init();
    tracing::info!("MEGA AI Testnet Auto Bot starting");

    // 可选：第一个参数为额外配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;

    let token = load_token(&config.api.token_file).context("Failed to load token")?;
    let gateway = HttpGateway::new(&config.api, &token).context("Failed to create HTTP gateway")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    tracing::info!("Press Ctrl+C to stop the bot");

    let mut scheduler = CycleScheduler::new(Arc::new(gateway), &config);
    let cycles = scheduler
        .run(shutdown.token())
        .await
        .context("Bot execution failed")?;
    match shutdown.reason() {
        Some(reason) => tracing::info!("Stopped by {} after {} cycles", reason, cycles),
        None => tracing::info!("Finished after {} cycles", cycles),
    }

    Ok(())
}
