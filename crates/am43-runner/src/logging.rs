//! Console logging.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "RUST_LOG";

/// Pick the filter directive. `--verbose` wins over the environment, which
/// wins over the `info` default.
pub fn filter_directive(verbose: bool, env: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match env {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ => "info".to_string(),
    }
}

/// Install the `tracing` subscriber on stderr. `log` records from the
/// protocol crate are forwarded to it.
///
/// A second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(verbose, env.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid {} directive ({}); defaulting to info", LOG_ENV, err);
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
