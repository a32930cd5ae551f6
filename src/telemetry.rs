//! Diagnostic logging through `tracing`.
//!
//! Everything goes to stderr. The filter is read from `RUST_LOG` and
//! defaults to [`DEFAULT_FILTER`].

use clap::ValueEnum;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "ticketsync=info";

/// Output layout of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event.
    #[default]
    Compact,
    /// Multi-line, human-oriented output.
    Pretty,
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (compact, pretty) = match format {
        LogFormat::Compact => (
            Some(fmt::layer().with_writer(std::io::stderr).compact()),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(fmt::layer().with_writer(std::io::stderr).pretty()),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(pretty)
        .try_init()
}
