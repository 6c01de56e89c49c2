//! # Console configuration DTO / 控制台配置 DTO
//!
//! Plain data handed to the orchestrator at construction time. Loading from
//! the environment or a TOML file lives in `sc-infra`.

use std::time::Duration;

/// Optional UI surfaces. They have no effect on the orchestrator itself and
/// are carried so the console can report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub testing_panel: bool,
    pub s3_browser: bool,
    pub python_scripts: bool,
    pub monday_integration: bool,
    pub compact_display: bool,
}

/// Polling cadence for long-running backend jobs.
/// 后台任务轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Data-processing status interval. No attempt cap.
    pub processing_interval: Duration,
    /// Receipt summary interval.
    pub receipt_interval: Duration,
    /// Receipt summary attempt cap.
    pub receipt_max_attempts: u32,
    /// How long a finished provisioning result stays visible.
    pub provisioning_close_delay: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_secs(2),
            receipt_interval: Duration::from_secs(5),
            receipt_max_attempts: 60,
            provisioning_close_delay: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Backend base URL, without trailing slash.
    pub api_base_url: String,
    /// Sent as `x-api-key` when present.
    pub api_key: Option<String>,
    /// Free-form environment tag (`development`, `production`, ...).
    pub environment: String,
    pub features: FeatureFlags,
    pub polling: PollingConfig,
    /// Rows per page for list displays.
    pub page_size: usize,
    pub http_timeout: Duration,
}

impl ConsoleConfig {
    pub fn defaults() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            api_key: None,
            environment: "development".to_string(),
            features: FeatureFlags::default(),
            polling: PollingConfig::default(),
            page_size: 25,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
