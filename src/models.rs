use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A mailbox label as reported by the mail service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Minimal header metadata of one message, built by the header extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub id: String,
    pub subject: String,
    pub from: String,
    /// Provider delivery time, never the spoofable `Date` header
    pub time: DateTime<Utc>,
    /// Not populated yet
    pub message_id: String,
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.id,
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Retention rule carried by a managed label name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetentionRule {
    /// Keep the `count` most recent messages of every sender
    KeepLast { count: u32 },
    /// Keep messages delivered within the last `days` days
    KeepDays { days: u32 },
}

impl RetentionRule {
    pub fn parameter(&self) -> u32 {
        match self {
            RetentionRule::KeepLast { count } => *count,
            RetentionRule::KeepDays { days } => *days,
        }
    }

    /// A zero parameter selects everything (KeepLast) or everything older than now (KeepDays)
    pub fn is_degenerate(&self) -> bool {
        self.parameter() == 0
    }
}

impl fmt::Display for RetentionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionRule::KeepLast { count } => write!(f, "keep last {} per sender", count),
            RetentionRule::KeepDays { days } => write!(f, "keep {} days", days),
        }
    }
}

/// A label that carries a retention rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedLabel {
    pub label: Label,
    pub rule: RetentionRule,
    /// False when the numeric suffix did not parse and the parameter fell back to 0
    pub parameter_parsed: bool,
}

/// Ordered, append-only list of message ids selected for deletion.
///
/// Duplicates are kept: a message selected by two rules appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSet {
    ids: Vec<String>,
}

impl DeletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one rule's selection, preserving its order
    pub fn append(&mut self, selected: Vec<String>) {
        self.ids.extend(selected);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// Number of distinct ids
    pub fn unique_count(&self) -> usize {
        self.ids.iter().collect::<HashSet<_>>().len()
    }
}

impl<'a> IntoIterator for &'a DeletionSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// One raw header name/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Answer of the "get message" call: delivery timestamp plus unordered headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub internal_date_ms: i64,
    pub headers: Vec<HeaderField>,
}

/// One page of message ids under a label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}
