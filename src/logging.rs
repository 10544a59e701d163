//! Logging setup for the binary. The library only emits `tracing` events.

use std::io;
use std::sync::Once;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

static INIT_ONCE: Once = Once::new();

/// Default filter for a `-v` count: warn, info, debug, then trace.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "recdiff=warn",
        1 => "recdiff=info",
        2 => "recdiff=debug",
        _ => "recdiff=trace",
    }
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` takes
/// precedence over `verbosity`. Later calls are no-ops.
pub fn init(verbosity: u8, format: LogFormat) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr);
        // Another subscriber may already be installed (tests, embedding apps).
        let _ = match format {
            LogFormat::Text => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    });
}
