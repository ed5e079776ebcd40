use std::fmt;

use chrono::{DateTime, Utc};

/// An inbound user-authored Signal message.
///
/// Built once per decoded record and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    sender: String,
    text: String,
    timestamp: i64,
    group_id: Option<String>,
}

impl Message {
    /// `group_id` of `Some("")` is treated as a direct message.
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: i64,
        group_id: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            group_id: group_id.filter(|g| !g.is_empty()),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sender-side timestamp in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Where a reply to this message goes: the group if there is one, else the sender.
    pub fn reply_destination(&self) -> Destination {
        match &self.group_id {
            Some(group) => Destination::Group(group.clone()),
            None => Destination::Direct(self.sender.clone()),
        }
    }
}

/// Target of an outbound reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Base64 group identifier.
    Group(String),
    /// Recipient phone number.
    Direct(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Group(id) => write!(f, "group {id}"),
            Destination::Direct(number) => {
                write!(f, "{}", crate::validation::mask_phone_number(number))
            }
        }
    }
}
