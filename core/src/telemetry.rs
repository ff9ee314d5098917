// Logging setup for the front end
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Env var holding the tracing filter directive (e.g. `synthe=debug,engine=debug`).
pub const LOG_ENV: &str = "SYNTHE_LOG";

/// Filter used when `SYNTHE_LOG` is unset. Standard error belongs to the
/// `ERR:<code>` protocol, so nothing is logged unless asked for.
pub const DEFAULT_FILTER: &str = "off";

/// Build the env filter from `SYNTHE_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a `fmt` subscriber writing to standard error.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init();
}
