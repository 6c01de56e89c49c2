//! Tracing configuration for the console
//!
//! Installs a `tracing-subscriber` registry with an environment filter and a
//! single fmt layer writing to stderr, so command output on stdout stays
//! machine-readable.
//!
//! Line format: `2025-01-15 10:30:45.123 INFO sc_app::usecases::receipts: src/...:42: message`

use std::io;

use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Check if running in development environment
fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// ## Behavior / 行为
/// - **Development**: debug for the console crates
/// - **Production**: info for the console crates, warn for the rest
/// - HTTP client internals stay at warn either way
fn build_filter_directives(is_dev: bool, verbose: bool) -> Vec<String> {
    let app_level = if is_dev || verbose { "debug" } else { "info" };
    vec![
        "warn".to_string(),
        format!("sweep_console={app_level}"),
        format!("sc_app={app_level}"),
        format!("sc_infra={app_level}"),
        format!("sc_core={app_level}"),
        "reqwest=warn".to_string(),
        "hyper=warn".to_string(),
    ]
}

/// Initialize the tracing subscriber
///
/// Respects `RUST_LOG` when set; otherwise uses [`build_filter_directives`].
///
/// ## Errors / 错误
///
/// Returns `Err` if a subscriber is already registered.
pub fn init_tracing_subscriber(verbose: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(build_filter_directives(is_development(), verbose).join(","))
    });

    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(io::stderr);

    registry().with(env_filter).with(stderr_layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults_to_info_for_console_crates() {
        let directives = build_filter_directives(false, false);
        assert!(directives.contains(&"sc_app=info".to_string()));
        assert!(directives.contains(&"sc_infra=info".to_string()));
        assert_eq!(directives[0], "warn");
    }

    #[test]
    fn verbose_flag_enables_debug() {
        let directives = build_filter_directives(false, true);
        assert!(directives.contains(&"sc_app=debug".to_string()));
    }

    #[test]
    fn directives_parse_as_env_filter() {
        let joined = build_filter_directives(true, false).join(",");
        assert!(EnvFilter::try_new(joined).is_ok());
    }
}
