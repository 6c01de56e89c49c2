//! # Dependency Injection / 依赖注入模块
//!
//! The only place that depends on `sc-infra` and `sc-app` at once. It builds
//! the adapters and hands them to the console through the port traits; it
//! makes no workflow decisions.

use std::sync::Arc;

use sc_app::ContestConsole;
use sc_core::ports::{ClockPort, GatewayPort, UploadPort};
use sc_core::ConsoleConfig;
use sc_infra::{HttpGateway, PresignedUploader, SystemClock};

/// Errors during dependency injection
/// 依赖注入错误（基础设施初始化失败）
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("HTTP gateway initialization failed: {0}")]
    GatewayInit(String),

    #[error("Upload transport initialization failed: {0}")]
    UploaderInit(String),
}

pub type WiringResult<T> = Result<T, WiringError>;

/// Assemble a console backed by the real HTTP adapters.
pub fn wire_console(config: ConsoleConfig) -> WiringResult<ContestConsole> {
    let gateway: Arc<dyn GatewayPort> = Arc::new(
        HttpGateway::from_config(&config).map_err(|e| WiringError::GatewayInit(e.to_string()))?,
    );
    let uploader: Arc<dyn UploadPort> = Arc::new(
        PresignedUploader::new(config.http_timeout)
            .map_err(|e| WiringError::UploaderInit(e.to_string()))?,
    );
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    tracing::debug!(
        base_url = %config.api_base_url,
        environment = %config.environment,
        api_key = config.api_key.is_some(),
        "console wired"
    );
    Ok(ContestConsole::new(config, gateway, uploader, clock))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wires_with_default_config() {
        let console = wire_console(ConsoleConfig::defaults()).unwrap();
        assert_eq!(console.config().api_base_url, "http://localhost:3000");
        assert!(console.selection().await.pair.is_none());
    }
}
