//! # Configuration Loader / 配置加载器
//!
//! Two sources, never merged with each other:
//!
//! - environment variables prefixed `SWEEP_CONSOLE_` (a `.env` file in the
//!   working directory is loaded first when present)
//! - a TOML file
//!
//! Anything a source leaves out keeps its value from
//! [`ConsoleConfig::defaults`]. Values that are present but cannot be parsed
//! are errors naming the variable or key.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::debug;

use sc_core::ConsoleConfig;

pub const ENV_PREFIX: &str = "SWEEP_CONSOLE_";

/// Loads `.env` (if any) and then reads the process environment.
pub fn load_from_env() -> anyhow::Result<ConsoleConfig> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to read .env file"),
    }
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds a config from a variable lookup. `key` is the full variable name.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<ConsoleConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |suffix: &str| -> Option<(String, String)> {
        let name = format!("{ENV_PREFIX}{suffix}");
        lookup(&name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| (name, v))
    };

    let mut config = ConsoleConfig::defaults();

    if let Some((_, url)) = get("API_BASE_URL") {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some((_, key)) = get("API_KEY") {
        config.api_key = Some(key);
    }
    if let Some((_, env)) = get("ENVIRONMENT") {
        config.environment = env;
    }
    if let Some((name, v)) = get("PAGE_SIZE") {
        config.page_size = parse_number(&name, &v)?;
    }
    if let Some((name, v)) = get("HTTP_TIMEOUT_SECS") {
        config.http_timeout = Duration::from_secs(parse_number(&name, &v)?);
    }

    let polling = &mut config.polling;
    if let Some((name, v)) = get("PROCESSING_POLL_MS") {
        polling.processing_interval = Duration::from_millis(parse_number(&name, &v)?);
    }
    if let Some((name, v)) = get("RECEIPT_POLL_MS") {
        polling.receipt_interval = Duration::from_millis(parse_number(&name, &v)?);
    }
    if let Some((name, v)) = get("RECEIPT_MAX_ATTEMPTS") {
        polling.receipt_max_attempts = parse_number(&name, &v)?;
    }
    if let Some((name, v)) = get("PROVISIONING_CLOSE_DELAY_MS") {
        polling.provisioning_close_delay = Duration::from_millis(parse_number(&name, &v)?);
    }

    let features = &mut config.features;
    for (suffix, flag) in [
        ("FEATURE_TESTING_PANEL", &mut features.testing_panel),
        ("FEATURE_S3_BROWSER", &mut features.s3_browser),
        ("FEATURE_PYTHON_SCRIPTS", &mut features.python_scripts),
        ("FEATURE_MONDAY", &mut features.monday_integration),
        ("COMPACT_DISPLAY", &mut features.compact_display),
    ] {
        if let Some((name, v)) = get(suffix) {
            *flag = parse_flag(&name, &v)?;
        }
    }

    Ok(config)
}

fn parse_number<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("{name} must be a non-negative integer (got `{value}`)"))
}

fn parse_flag(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{name} must be a boolean (got `{value}`)")),
    }
}

// ---------------------------------------------------------------------------
// TOML file
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    environment: Option<String>,
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    polling: PollingSection,
    #[serde(default)]
    features: FeatureSection,
    #[serde(default)]
    display: DisplaySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    base_url: Option<String>,
    key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollingSection {
    processing_interval_ms: Option<u64>,
    receipt_interval_ms: Option<u64>,
    receipt_max_attempts: Option<u32>,
    provisioning_close_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureSection {
    testing_panel: Option<bool>,
    s3_browser: Option<bool>,
    python_scripts: Option<bool>,
    monday_integration: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DisplaySection {
    page_size: Option<usize>,
    compact: Option<bool>,
}

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
pub fn load_from_file(path: &Path) -> anyhow::Result<ConsoleConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    from_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn from_toml_str(content: &str) -> anyhow::Result<ConsoleConfig> {
    let file: ConfigFile = toml::from_str(content).context("Failed to parse config as TOML")?;
    let mut config = ConsoleConfig::defaults();

    if let Some(environment) = file.environment {
        config.environment = environment;
    }
    if let Some(url) = file.api.base_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    config.api_key = file.api.key.filter(|k| !k.trim().is_empty());
    if let Some(secs) = file.api.timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }

    let polling = &mut config.polling;
    if let Some(ms) = file.polling.processing_interval_ms {
        polling.processing_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = file.polling.receipt_interval_ms {
        polling.receipt_interval = Duration::from_millis(ms);
    }
    if let Some(n) = file.polling.receipt_max_attempts {
        polling.receipt_max_attempts = n;
    }
    if let Some(ms) = file.polling.provisioning_close_delay_ms {
        polling.provisioning_close_delay = Duration::from_millis(ms);
    }

    let features = &mut config.features;
    features.testing_panel = file.features.testing_panel.unwrap_or(features.testing_panel);
    features.s3_browser = file.features.s3_browser.unwrap_or(features.s3_browser);
    features.python_scripts = file
        .features
        .python_scripts
        .unwrap_or(features.python_scripts);
    features.monday_integration = file
        .features
        .monday_integration
        .unwrap_or(features.monday_integration);
    features.compact_display = file.display.compact.unwrap_or(features.compact_display);
    if let Some(page_size) = file.display.page_size {
        config.page_size = page_size;
    }

    Ok(config)
}
