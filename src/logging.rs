//! Diagnostic logging setup.
//!
//! Progress and per-item failures are emitted through `tracing` to stderr so
//! that stdout stays clean for the JSON/YAML summary. `RUST_LOG` takes
//! precedence over the `--verbose` level when set.

use tracing_subscriber::EnvFilter;

/// Map the `--verbose` ladder onto a `tracing` filter directive.
pub fn filter_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "off",
        1 => "info",
        2..=4 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: u8, ansi: bool) {
    let level = filter_for_verbosity(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("unsubscriber={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .try_init();
}
