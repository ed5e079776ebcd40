use std::{path::Path, sync::Arc};

use tracing::{error, info};

use sigbot_core::{
    config::{load_dotenv_if_present, Config},
    validation::mask_phone_number,
};

mod supervisor;

#[tokio::main]
async fn main() -> Result<(), sigbot_core::Error> {
    let dotenv_loaded = load_dotenv_if_present(Path::new(".env"));
    let cfg = Arc::new(Config::load()?);
    sigbot_core::logging::init("sigbot", &cfg.log_level)?;

    info!("Starting Signal Bot...");
    if !dotenv_loaded {
        info!("No .env file found, using environment variables");
    }
    info!(
        "Bot configured for number: {}",
        mask_phone_number(&cfg.phone_number)
    );
    info!("Command prefix: {}", cfg.command_prefix);
    info!("signal-cli: {}", cfg.signal_cli_path.display());

    supervisor::run(cfg).await.map_err(|e| {
        error!("{e:#}");
        sigbot_core::Error::External(format!("{e:#}"))
    })
}
