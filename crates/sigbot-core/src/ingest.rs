//! JSON Lines ingestion loop.
//!
//! Reads `signal-cli receive --json` output one record per line and drives
//! handler + sender for each data message. Per-record failures are logged and
//! skipped; only a failed read ends the loop with an error.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::{
    commands::log_message,
    ports::{MessageHandler, MessageSender},
    wire::SignalRecord,
    Result,
};

const LINE_PREVIEW_MAX_CHARS: usize = 200;

/// Counters for one run of the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub malformed: u64,
    /// Records without a data message (sync, receipts, typing...).
    pub skipped: u64,
    pub dispatched: u64,
    pub handler_errors: u64,
    pub replies_sent: u64,
    pub send_failures: u64,
}

/// Run until `reader` hits EOF.
///
/// Sends happen inline: the next line is not read until the current reply has
/// been delivered or has failed.
pub async fn run<R>(
    mut reader: R,
    handler: &dyn MessageHandler,
    sender: &dyn MessageSender,
) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();

    loop {
        // Raw bytes: a line that is not UTF-8 is a bad record, not a broken stream.
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = trim_line_ending(&buf);

        stats.lines += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record = match SignalRecord::parse_bytes(line) {
            Ok(r) => r,
            Err(e) => {
                stats.malformed += 1;
                warn!(
                    "Failed to parse message: {e} (line: {})",
                    truncate_text(&String::from_utf8_lossy(line), LINE_PREVIEW_MAX_CHARS)
                );
                continue;
            }
        };

        let Some(msg) = record.into_message() else {
            stats.skipped += 1;
            debug!("Ignoring record without a data message");
            continue;
        };

        stats.dispatched += 1;
        log_message(&msg);
        if let Some(sent_at) = msg.sent_at() {
            debug!("Message sent at {}", sent_at.to_rfc3339());
        }

        let reply = match handler.handle(&msg) {
            Ok(Some(reply)) if !reply.is_empty() => reply,
            Ok(_) => continue,
            Err(e) => {
                stats.handler_errors += 1;
                warn!("Error handling message: {e}");
                continue;
            }
        };

        let dest = msg.reply_destination();
        match sender.send(&dest, &reply).await {
            Ok(()) => {
                stats.replies_sent += 1;
                info!("Sent response to {dest}: {reply}");
            }
            Err(e) => {
                stats.send_failures += 1;
                warn!("Failed to send response to {dest}: {e}");
            }
        }
    }

    Ok(stats)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}
