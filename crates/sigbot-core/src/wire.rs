//! `signal-cli receive --json` record model.
//!
//! Every field is optional and unknown fields are ignored, so newer
//! `signal-cli` releases keep decoding. Only `envelope.dataMessage` is acted on.

use serde::Deserialize;

use crate::{domain::Message, Result};

/// One JSON Lines record.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    #[serde(default)]
    pub envelope: Envelope,
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub source_uuid: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub data_message: Option<DataMessage>,
    #[serde(default)]
    pub sync_message: Option<SyncMessage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// `null` for reactions, stickers and other non-text payloads.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub group_info: Option<GroupInfo>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Transcripts of messages the account sent from another device.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    #[serde(default)]
    pub sent_message: Option<SentMessage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl SignalRecord {
    /// Strict decode of a single line.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Strict decode of a raw line. Invalid UTF-8 is a decode error.
    pub fn parse_bytes(line: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(line)?)
    }

    /// The user-authored message carried by this record, if any.
    pub fn into_message(self) -> Option<Message> {
        let envelope = self.envelope;
        let data = envelope.data_message?;

        let group_id = data.group_info.and_then(|g| g.group_id);
        Some(Message::new(
            envelope.source_number.unwrap_or_default(),
            data.message.unwrap_or_default(),
            data.timestamp.unwrap_or_default(),
            group_id,
        ))
    }
}
