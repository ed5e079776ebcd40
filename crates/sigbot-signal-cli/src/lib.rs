//! `signal-cli` adapter.
//!
//! Receiving: one long-lived `signal-cli receive --json` child whose stdout is
//! the bot's only input. Sending: one short-lived `signal-cli send` per reply.

use std::path::PathBuf;

use sigbot_core::{config::Config, domain::Destination};

pub mod receive;
pub mod send;

pub use receive::ReceiveProcess;
pub use send::SignalCliSender;

/// Everything needed to invoke `signal-cli` for the bot's account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalCliConfig {
    pub program: PathBuf,
    pub account: String,
    pub data_dir: PathBuf,
}

impl SignalCliConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.signal_cli_path.clone(),
            account: cfg.phone_number.clone(),
            data_dir: cfg.data_dir.clone(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "-a".to_string(),
            self.account.clone(),
            "--config".to_string(),
            self.data_dir.display().to_string(),
        ]
    }
}

/// A concrete `signal-cli` command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// `signal-cli -a <account> --config <dir> receive --json`
pub fn receive_invocation(cfg: &SignalCliConfig) -> CliInvocation {
    let mut args = cfg.base_args();
    args.push("receive".to_string());
    args.push("--json".to_string());
    CliInvocation {
        program: cfg.program.clone(),
        args,
    }
}

/// `signal-cli -a <account> --config <dir> send (-g <group> | <number>) -m <text>`
///
/// Does not validate `dest`; [`SignalCliSender`] does that before calling this.
pub fn send_invocation(cfg: &SignalCliConfig, dest: &Destination, text: &str) -> CliInvocation {
    let mut args = cfg.base_args();
    args.push("send".to_string());
    match dest {
        Destination::Group(id) => {
            args.push("-g".to_string());
            args.push(id.clone());
        }
        Destination::Direct(number) => args.push(number.clone()),
    }
    args.push("-m".to_string());
    args.push(text.to_string());
    CliInvocation {
        program: cfg.program.clone(),
        args,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SignalCliConfig {
        test_support::cfg(PathBuf::from("signal-cli"))
    }

    #[test]
    fn receive_args() {
        let inv = receive_invocation(&cfg());
        assert_eq!(inv.program, PathBuf::from("signal-cli"));
        assert_eq!(
            inv.args,
            vec![
                "-a",
                "+15550000000",
                "--config",
                "/tmp/signal-data",
                "receive",
                "--json"
            ]
        );
    }

    #[test]
    fn send_args_for_group_and_direct() {
        let inv = send_invocation(&cfg(), &Destination::Group("Zm9v=".into()), "hi there");
        assert_eq!(
            inv.args,
            vec![
                "-a",
                "+15550000000",
                "--config",
                "/tmp/signal-data",
                "send",
                "-g",
                "Zm9v=",
                "-m",
                "hi there"
            ]
        );

        let inv = send_invocation(&cfg(), &Destination::Direct("+15551234567".into()), "yo");
        assert_eq!(
            inv.args[4..],
            ["send", "+15551234567", "-m", "yo"].map(String::from)
        );
    }

    #[test]
    fn config_is_derived_from_bot_config() {
        let bot = Config {
            phone_number: "+15551234567".to_string(),
            data_dir: PathBuf::from("./signal-data"),
            command_prefix: "!".to_string(),
            log_level: "info".to_string(),
            signal_cli_path: PathBuf::from("/usr/bin/signal-cli"),
        };
        let cfg = SignalCliConfig::from_config(&bot);
        assert_eq!(cfg.account, "+15551234567");
        assert_eq!(cfg.program, PathBuf::from("/usr/bin/signal-cli"));
        assert_eq!(cfg.data_dir, PathBuf::from("./signal-data"));
    }
}
