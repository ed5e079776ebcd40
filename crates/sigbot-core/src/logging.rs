use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// `RUST_LOG` wins when set. Otherwise every bot crate logs at `level`
/// (the configured `LOG_LEVEL`) and dependencies stay at `warn`.
pub fn init(service_name: &str, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(service_name, level)))
        .map_err(|e| Error::Config(format!("invalid LOG_LEVEL {level:?}: {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    Ok(())
}

fn default_directives(service_name: &str, level: &str) -> String {
    let level = level.trim().to_lowercase();
    format!("warn,{service_name}={level},sigbot_core={level},sigbot_signal_cli={level}")
}
