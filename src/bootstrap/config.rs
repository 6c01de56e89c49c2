//! # Configuration source selection / 配置来源选择
//!
//! A `--config` file wins; otherwise the environment is used.

use std::path::Path;

use anyhow::Context;
use sc_core::ConsoleConfig;

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ConsoleConfig> {
    match path {
        Some(path) => sc_infra::config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => sc_infra::config::load_from_env().context("Failed to load configuration from environment"),
    }
}
