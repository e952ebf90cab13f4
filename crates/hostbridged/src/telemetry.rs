//! Structured telemetry initialisation for the daemon.

use std::io::{self, IsTerminal};

use hostbridge_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Caps applied to per-job targets when the filter asks for more than `info`
/// without naming them. Every host job logs on these targets, so a blanket
/// `debug` would otherwise bury the session and dispatch lines.
const VERBOSE_TARGET_CAPS: &[(&str, LevelFilter)] = &[(
    concat!(env!("CARGO_PKG_NAME"), "::bridge"),
    LevelFilter::INFO,
)];

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching global
/// state, so tests and the binary can both call it freely.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a foreign
/// subscriber is already installed.
///
/// # Examples
///
/// ```rust
/// use hostbridge_config::Config;
/// use hostbridged::telemetry;
///
/// # fn main() -> Result<(), hostbridged::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|()| TelemetryHandle)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = env_filter(config.log_filter())?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn env_filter(spec: &str) -> Result<EnvFilter, TelemetryError> {
    let mut filter =
        EnvFilter::try_new(spec).map_err(|error| TelemetryError::Filter(error.to_string()))?;
    if filter.max_level_hint().is_some_and(|level| level > LevelFilter::INFO) {
        for (target, cap) in VERBOSE_TARGET_CAPS {
            if spec.contains(target) {
                continue;
            }
            let directive: Directive = format!("{target}={cap}")
                .parse()
                .map_err(|error: tracing_subscriber::filter::ParseError| {
                    TelemetryError::Filter(error.to_string())
                })?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn invalid_filters_are_rejected_before_installing() {
        let config = Config {
            log_filter: String::from("hostbridged=verbose"),
            ..Config::default()
        };
        let result = install_subscriber(&config);
        assert!(matches!(result, Err(TelemetryError::Filter(_))));
    }

    fn rendered(spec: &str) -> String {
        env_filter(spec)
            .expect("filter parses")
            .to_string()
            .to_ascii_lowercase()
    }

    #[rstest]
    #[case::blanket_debug("debug", true)]
    #[case::blanket_trace("trace", true)]
    #[case::default_info("info", false)]
    #[case::quiet("warn", false)]
    #[case::bridge_named("debug,hostbridged::bridge=trace", false)]
    fn verbose_filters_cap_the_bridge(#[case] spec: &str, #[case] capped: bool) {
        assert_eq!(rendered(spec).contains("hostbridged::bridge=info"), capped);
    }
}
