use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use sigbot_core::{
    domain::Destination, errors::Error, ports::MessageSender, validation::validate_destination,
    Result,
};

use crate::{send_invocation, SignalCliConfig};

/// Pause before every `signal-cli send` to stay clear of rate limits.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(100);

/// Sends replies with one `signal-cli send` invocation each.
///
/// No retries and no timeout: a hung `signal-cli` stalls the caller.
#[derive(Clone, Debug)]
pub struct SignalCliSender {
    cfg: SignalCliConfig,
    send_delay: Duration,
}

impl SignalCliSender {
    pub fn new(cfg: SignalCliConfig) -> Self {
        Self {
            cfg,
            send_delay: DEFAULT_SEND_DELAY,
        }
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }
}

#[async_trait]
impl MessageSender for SignalCliSender {
    async fn send(&self, dest: &Destination, text: &str) -> Result<()> {
        validate_destination(dest)?;

        let inv = send_invocation(&self.cfg, dest, text);
        tokio::time::sleep(self.send_delay).await;

        debug!("Running signal-cli send to {dest}");
        let output = Command::new(&inv.program)
            .args(&inv.args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::External(format!(
                "signal-cli send failed: {}, output: {}",
                output.status,
                combined.trim_end()
            )));
        }

        Ok(())
    }
}
