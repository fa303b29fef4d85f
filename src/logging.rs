//! Logging setup for the binary

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise tandem logs at info, or debug when
/// verbose. Output goes to stderr.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "tandem=debug" } else { "tandem=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
