use tracing_subscriber::EnvFilter;

/// Initialize structured logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to the provided
/// level. `verbose` raises anything quieter than `debug` to `debug`.
pub fn init(log_level: &str, verbose: bool) {
    let level = effective_level(log_level, verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn effective_level(log_level: &str, verbose: bool) -> &str {
    let quiet = ["error", "warn", "info"]
        .iter()
        .any(|level| log_level.eq_ignore_ascii_case(level));
    if verbose && quiet {
        "debug"
    } else {
        log_level
    }
}
