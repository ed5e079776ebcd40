use async_trait::async_trait;

use crate::{
    domain::{Destination, Message},
    Result,
};

/// Turns an inbound message into an optional reply.
///
/// `Ok(None)` means "no action". Errors are per-message and never stop ingestion.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, msg: &Message) -> Result<Option<String>>;
}

/// Outbound port: deliver one reply, once.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, dest: &Destination, text: &str) -> Result<()>;
}
