//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays parseable. The
//! level comes from `RUST_LOG` and defaults to `warn`; `--verbose` on the
//! CLI raises the default to `debug` for this crate.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose {
        "warn,code_assistant=debug,code_assistant_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
