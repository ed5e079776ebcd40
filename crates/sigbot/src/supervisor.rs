//! Lifecycle of the `signal-cli receive` child.
//!
//! Ingestion and the shutdown-signal listener race in one `select!`. Whichever
//! finishes first decides how the child is taken down.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{info, warn};

use sigbot_core::{commands::CommandDispatcher, config::Config, ingest};
use sigbot_signal_cli::{ReceiveProcess, SignalCliConfig, SignalCliSender};

/// How long `signal-cli` gets to exit after SIGINT before it is killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl State {
    fn can_move_to(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Starting, State::Running)
                | (State::Running, State::ShuttingDown)
                | (State::Running, State::Stopped)
                | (State::ShuttingDown, State::Stopped)
        )
    }
}

struct Lifecycle {
    state: State,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: State::Starting,
        }
    }

    fn enter(&mut self, next: State) {
        if !self.state.can_move_to(next) {
            warn!("Unexpected lifecycle transition {:?} -> {next:?}", self.state);
        }
        info!("Lifecycle: {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// SIGINT/SIGTERM listener, installed before the child is spawned.
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    fn install() -> anyhow::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())
                .context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("failed to install SIGTERM handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

enum Exit {
    StreamEnded(sigbot_core::Result<ingest::IngestStats>),
    Signal(&'static str),
}

/// Run the bot until `signal-cli` closes its stdout or a shutdown signal arrives.
///
/// Only a failed read of the record stream is an error; a signal is a clean exit.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let mut lifecycle = Lifecycle::new();
    let mut signals = ShutdownSignals::install()?;

    let signal_cfg = SignalCliConfig::from_config(&cfg);
    let dispatcher = CommandDispatcher::new(cfg.command_prefix.clone());
    let sender = SignalCliSender::new(signal_cfg.clone());

    let mut receiver = ReceiveProcess::spawn(&signal_cfg).with_context(|| {
        format!(
            "failed to start signal-cli ({})",
            signal_cfg.program.display()
        )
    })?;
    let stdout = receiver.take_stdout()?;
    lifecycle.enter(State::Running);
    info!("Bot is now listening for messages...");
    info!("Press Ctrl+C to stop");

    let exit = tokio::select! {
        res = ingest::run(stdout, &dispatcher, &sender) => Exit::StreamEnded(res),
        name = signals.recv() => Exit::Signal(name),
    };

    match exit {
        Exit::Signal(name) => {
            lifecycle.enter(State::ShuttingDown);
            info!("Received {name}, shutting down bot...");
            let outcome = receiver.shutdown(SHUTDOWN_GRACE).await?;
            info!("signal-cli stopped ({outcome:?})");
        }
        Exit::StreamEnded(Ok(stats)) => {
            info!("signal-cli closed its output: {stats:?}");
            let status = receiver.wait().await?;
            if !status.success() {
                let tail = receiver.stderr_tail().await;
                warn!("signal-cli exited with error: {status}");
                if !tail.trim().is_empty() {
                    warn!("signal-cli stderr (tail):\n{tail}");
                }
            }
        }
        Exit::StreamEnded(Err(e)) => {
            if let Err(kill_e) = receiver.shutdown(SHUTDOWN_GRACE).await {
                warn!("Failed to stop signal-cli: {kill_e}");
            }
            return Err(e).context("error reading from signal-cli");
        }
    }

    lifecycle.enter(State::Stopped);
    Ok(())
}
