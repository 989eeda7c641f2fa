//! Logging
//!
//! Everything logs through the `log` facade (`log::info!`, `log::debug!`, ...).
//! [`init_logging`] installs `env_logger` once, rendering lines in the
//! configured [`LogFormat`]. `RUST_LOG`, when set, takes precedence over the
//! configured level.
//!
//! ```rust,no_run
//! use conduit_core::config::LoggingConfig;
//!
//! conduit_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("Server starting on port {}", 1234);
//! ```

pub mod formatter;
pub mod level;

pub use formatter::{LogEntry, LogFormat};
pub use level::LogLevel;

use crate::config::LoggingConfig;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger. Calls after the first one are no-ops.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    INIT.call_once(|| {
        let format = config.format;
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()));
        builder.format(move |buf, record| writeln!(buf, "{}", format.format_entry(&LogEntry::from_record(record))));

        if let Err(e) = builder.try_init() {
            eprintln!("Logger already installed: {}", e);
        }
    });
    Ok(())
}
