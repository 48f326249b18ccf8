use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the process-wide tracing subscriber. Grounded on
/// `xchecker-utils/src/logging.rs::init_tracing`, trimmed to this crate's
/// needs: no secret redaction (nothing here handles user secrets) and no
/// verbose/compact format split, since the flow engine's own crates
/// already choose their log levels via `tracing`'s target filtering.
pub fn init_tracing(debug: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "xeda=debug,info" } else { "xeda=info,warn" })
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .try_init();
}
