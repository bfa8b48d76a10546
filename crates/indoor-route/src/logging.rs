/*!
Logging integration for the indoor-route binary.

Log output always goes to stderr so that route output on stdout (text or JSON)
stays machine-readable. When the `profiling` feature is enabled, the
`profiling` shim emits its scopes as `tracing` spans, which the same
subscriber reports at `trace` level.
*/

use tracing_subscriber::prelude::*;

/// Default filter when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose || cfg!(debug_assertions) {
        "debug"
    } else {
        "warn,indoor_route=info"
    }
}

/// Initialize logging with sensible defaults
///
/// Behavior:
/// - If RUST_LOG is not set, set a default (`debug` when `verbose`).
/// - Install a `fmt` layer writing to stderr, filtered by `EnvFilter`.
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            std::env::set_var("RUST_LOG", default_filter(verbose));
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    let registry = tracing_subscriber::registry().with(fmt_layer);
    if registry.try_init().is_err() {
        tracing::warn!("Logging was already initialized");
        return;
    }

    tracing::debug!(
        "Logging initialized (profiling {})",
        if cfg!(feature = "profiling") {
            "enabled"
        } else {
            "disabled"
        }
    );
}
