use std::{collections::VecDeque, process::ExitStatus, process::Stdio, sync::Arc, time::Duration};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStdout, Command},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use sigbot_core::{errors::Error, Result};

use crate::{receive_invocation, SignalCliConfig};

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;

#[derive(Clone, Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// How the child went away during [`ReceiveProcess::shutdown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// It had already exited.
    AlreadyExited,
    /// It exited within the grace period after SIGINT.
    Graceful,
    /// It was still running after the grace period and got SIGKILL.
    Killed,
}

/// The long-lived `signal-cli receive --json` child.
#[derive(Debug)]
pub struct ReceiveProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_tail: Arc<Mutex<StderrTail>>,
}

impl ReceiveProcess {
    pub fn spawn(cfg: &SignalCliConfig) -> Result<Self> {
        let inv = receive_invocation(cfg);

        let mut child = Command::new(&inv.program)
            .args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::External("signal-cli stdout was not captured".to_string()))?;
        let stderr_tail = Arc::new(Mutex::new(StderrTail::default()));

        // Drain stderr in background to avoid blocking on a full pipe.
        if let Some(stderr) = child.stderr.take() {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                // Raw bytes: a non-UTF-8 line must not end the drain.
                let mut r = BufReader::new(stderr);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match r.read_until(b'\n', &mut buf).await {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Failed to read signal-cli stderr: {e}");
                            break;
                        }
                    }
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    debug!("signal-cli: {line}");
                    tail.lock().await.push_line(line);
                }
            });
        }

        info!("signal-cli receive started (pid {:?})", child.id());
        Ok(Self {
            child,
            stdout: Some(stdout),
            stderr_tail,
        })
    }

    /// The record stream. Can only be taken once.
    pub fn take_stdout(&mut self) -> Result<BufReader<ChildStdout>> {
        self.stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| Error::External("signal-cli stdout already taken".to_string()))
    }

    /// Last lines the child wrote to stderr.
    pub async fn stderr_tail(&self) -> String {
        self.stderr_tail.lock().await.snapshot()
    }

    /// Reap the child after its stdout closed.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// SIGINT, wait up to `grace`, then SIGKILL. Always reaps the child.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<ShutdownOutcome> {
        if self.child.try_wait()?.is_some() {
            return Ok(ShutdownOutcome::AlreadyExited);
        }

        if let Some(pid) = self.child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
                Ok(()) => debug!("Sent SIGINT to signal-cli (pid {pid})"),
                Err(e) => warn!("Failed to interrupt signal-cli (pid {pid}): {e}"),
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                info!("signal-cli exited: {status}");
                Ok(ShutdownOutcome::Graceful)
            }
            Err(_) => {
                warn!(
                    "signal-cli still running after {}ms, killing",
                    grace.as_millis()
                );
                // Child::kill also reaps.
                self.child.kill().await?;
                Ok(ShutdownOutcome::Killed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_is_bounded() {
        let mut tail = StderrTail::default();
        for i in 0..(STDERR_TAIL_MAX_LINES + 50) {
            tail.push_line(format!("line {i}"));
        }
        assert_eq!(tail.lines.len(), STDERR_TAIL_MAX_LINES);
        assert!(tail.snapshot().ends_with(&format!("line {}", STDERR_TAIL_MAX_LINES + 49)));

        let mut tail = StderrTail::default();
        tail.push_line("x".repeat(STDERR_TAIL_MAX_BYTES));
        tail.push_line("last".to_string());
        assert_eq!(tail.snapshot(), "last");
    }

    #[cfg(unix)]
    mod process {
        use tokio::io::AsyncBufReadExt;

        use super::super::*;
        use crate::test_support::{cfg, fake_signal_cli, tmp_dir};

        #[tokio::test]
        async fn streams_stdout_and_captures_stderr() {
            let dir = tmp_dir("sigbot-recv-eof");
            let program = fake_signal_cli(
                &dir,
                "echo '{\"envelope\":{}}'\necho 'second'\necho 'WARN Config file is in use' >&2\nexit 2",
            );
            let mut proc = ReceiveProcess::spawn(&cfg(program)).unwrap();

            let mut lines = proc.take_stdout().unwrap().lines();
            assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("{\"envelope\":{}}"));
            assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("second"));
            assert_eq!(lines.next_line().await.unwrap(), None);
            assert!(proc.take_stdout().is_err());

            let status = proc.wait().await.unwrap();
            assert_eq!(status.code(), Some(2));

            // The drain task may lag behind process exit.
            let mut tail = String::new();
            for _ in 0..50 {
                tail = proc.stderr_tail().await;
                if !tail.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert_eq!(tail, "WARN Config file is in use");

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[tokio::test]
        async fn stderr_drain_survives_invalid_utf8() {
            let dir = tmp_dir("sigbot-recv-stderr");
            let program = fake_signal_cli(
                &dir,
                "printf 'bad \\377\\n' >&2\necho 'after' >&2\nexit 0",
            );
            let mut proc = ReceiveProcess::spawn(&cfg(program)).unwrap();
            let _stdout = proc.take_stdout().unwrap();
            proc.wait().await.unwrap();

            let mut tail = String::new();
            for _ in 0..50 {
                tail = proc.stderr_tail().await;
                if tail.ends_with("after") {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert_eq!(tail, "bad \u{FFFD}\nafter");

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[tokio::test]
        async fn shutdown_interrupts_gracefully() {
            let dir = tmp_dir("sigbot-recv-int");
            let program = fake_signal_cli(&dir, "exec sleep 30");
            let mut proc = ReceiveProcess::spawn(&cfg(program)).unwrap();

            let outcome = proc.shutdown(Duration::from_secs(5)).await.unwrap();
            assert_eq!(outcome, ShutdownOutcome::Graceful);

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[tokio::test]
        async fn shutdown_kills_after_grace_period() {
            let dir = tmp_dir("sigbot-recv-kill");
            let program = fake_signal_cli(&dir, "trap '' INT\nexec sleep 30");
            let mut proc = ReceiveProcess::spawn(&cfg(program)).unwrap();
            // Let the shell install its trap before we signal it.
            tokio::time::sleep(Duration::from_millis(200)).await;

            let outcome = proc.shutdown(Duration::from_millis(200)).await.unwrap();
            assert_eq!(outcome, ShutdownOutcome::Killed);

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[tokio::test]
        async fn shutdown_after_exit_is_a_no_op() {
            let dir = tmp_dir("sigbot-recv-done");
            let program = fake_signal_cli(&dir, "exit 0");
            let mut proc = ReceiveProcess::spawn(&cfg(program)).unwrap();
            proc.wait().await.unwrap();

            let outcome = proc.shutdown(Duration::from_millis(100)).await.unwrap();
            assert_eq!(outcome, ShutdownOutcome::AlreadyExited);

            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}
