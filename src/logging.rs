//! Tracing setup for hosts embedding the library.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact subscriber at INFO unless `RUST_LOG` says otherwise
pub fn init() {
  init_with_level("info")
}

/// `RUST_LOG` still overrides `default_level`. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init_with_level(default_level: &str) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().compact())
    .try_init();
}

/// Route logs through the test harness writer
#[cfg(test)]
pub fn init_test() {
  let _ = tracing_subscriber::fmt()
    .with_test_writer()
    .with_env_filter(EnvFilter::new("debug"))
    .try_init();
}
