/*!
 * Logging Module
 * Subscriber setup, request logging middleware and client log types
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Directory the rolling log files are written to.
const LOG_DIR: &str = "logs";

/// Filter directive used when `RUST_LOG` is unset.
fn default_directive(is_production: bool) -> String {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if is_production {
            "info".to_string()
        } else {
            "debug".to_string()
        }
    });
    format!("portfolio_dashboard={level},tower_http=debug,axum=debug")
}

/// Initialize the logging system.
///
/// The returned guards flush the background writers on drop and must be
/// held for the lifetime of the process.
pub fn init(is_production: bool) -> Vec<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("cannot create {LOG_DIR}/: {e}");
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(LOG_DIR, "app.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());
    let mut guards = vec![file_guard, console_guard];

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(is_production)));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if is_production {
        let (error_writer, error_guard) = non_blocking(rolling::daily(LOG_DIR, "error.log"));
        guards.push(error_guard);

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .try_init()
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }

    tracing::info!(production = is_production, "logging initialized");
    guards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_targets_crate() {
        let directive = default_directive(true);
        assert!(directive.starts_with("portfolio_dashboard="));
        assert!(directive.contains("tower_http=debug"));
    }
}
