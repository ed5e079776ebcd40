/// Core error type for the bot.
///
/// Adapter crates map their specific failures into this type so the binary can
/// tell fatal errors (config, stream I/O) from per-message ones.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {kind}: {value}")]
    InvalidDestination { kind: &'static str, value: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
