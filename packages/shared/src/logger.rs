//! Logging setup utilities for Chatline binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// This function sets up logging for the library packages and the binary.
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "chatline-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use chatline_shared::logger::setup_logger;
///
/// setup_logger("chatline-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the fallback filter directive used when `RUST_LOG` is not set.
///
/// Binary names use dashes while tracing targets use underscores, so both the
/// binary and the packages it is built from get the same level.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let target = binary_name.replace('-', "_");
    format!(
        "chatline_server={level},chatline_client={level},{target}={level},tower_http={level}",
        level = default_log_level,
    )
}
