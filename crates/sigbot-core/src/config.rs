use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, validation::is_valid_phone_number, Result};

pub const DEFAULT_DATA_DIR: &str = "./signal-data";
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SIGNAL_CLI: &str = "signal-cli";

/// Typed bot configuration, loaded once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Account the bot runs as (`-a` for every `signal-cli` call).
    pub phone_number: String,
    /// `signal-cli --config` state directory.
    pub data_dir: PathBuf,
    pub command_prefix: String,
    pub log_level: String,
    pub signal_cli_path: PathBuf,
}

impl Config {
    /// Load from the process environment.
    ///
    /// Call [`load_dotenv_if_present`] first to pre-populate it from a settings file.
    pub fn load() -> Result<Self> {
        Self::from_lookup(env_str)
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let Some(phone_number) = get("SIGNAL_PHONE_NUMBER") else {
            return Err(Error::Config(
                "SIGNAL_PHONE_NUMBER environment variable is required".to_string(),
            ));
        };
        let phone_number = phone_number.trim().to_string();
        if !is_valid_phone_number(&phone_number) {
            return Err(Error::Config(
                "SIGNAL_PHONE_NUMBER must look like +<country code><number>".to_string(),
            ));
        }

        let data_dir =
            PathBuf::from(get("SIGNAL_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let command_prefix =
            get("BOT_COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());
        let log_level = get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let signal_cli_path = get("SIGNAL_CLI_PATH")
            .map(PathBuf::from)
            .or_else(|| which_in_path(DEFAULT_SIGNAL_CLI))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SIGNAL_CLI));

        Ok(Self {
            phone_number,
            data_dir,
            command_prefix,
            log_level,
            signal_cli_path,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Copy `KEY=value` pairs from `path` into the process environment.
///
/// Existing variables are left alone. Returns `false` when the file could not be read.
pub fn load_dotenv_if_present(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, dotenv_value(v));
    }

    true
}

/// Quoted values are taken up to the closing quote. Unquoted values end at a
/// `#` preceded by whitespace.
fn dotenv_value(raw: &str) -> &str {
    let val = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = val.strip_prefix(quote).and_then(|rest| {
            rest.find(quote).map(|end| &rest[..end])
        }) {
            return inner;
        }
    }

    let comment = val
        .char_indices()
        .zip(val.chars().skip(1))
        .find(|((_, c), next)| c.is_whitespace() && *next == '#')
        .map(|((i, _), _)| i);
    match comment {
        Some(i) => val[..i].trim_end(),
        None => val,
    }
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
