use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Default filter directive for the given verbosity flags
pub fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "figma_squeeze=warn"
    } else if verbose {
        "figma_squeeze=debug"
    } else {
        "figma_squeeze=info"
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout stays reserved for the JSON report.
/// `RUST_LOG` takes precedence over the quiet/verbose flags.
pub fn init_logging(quiet: bool, verbose: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
