use serde::{Deserialize, Serialize};

/// Spreadsheet header row, in output order
pub const COLUMNS: [&str; 6] = [
    "Date",
    "From Name",
    "From Email",
    "From Username",
    "From Domain",
    "To",
];

/// Structured form of a `Display Name <local@domain>` header value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub display_name: String,
    pub email: String,
    pub local_part: String,
    pub domain: String,
}

/// The three headers we keep from a fetched message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRecord {
    /// Raw `Date` header, not parsed
    pub date: String,
    /// Parsed `From` header; `None` when absent or not in `Name <email>` form
    pub from: Option<Address>,
    /// Raw `To` header
    pub to: String,
}

impl MessageRecord {
    /// Sender email, or an empty string when the From header did not parse
    pub fn from_email(&self) -> &str {
        self.from.as_ref().map(|a| a.email.as_str()).unwrap_or("")
    }
}

/// One exported spreadsheet line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    pub date: String,
    pub from_name: String,
    pub from_email: String,
    pub from_username: String,
    pub from_domain: String,
    pub to: String,
}

impl Row {
    /// Build a row from a record that carries a parsed sender
    pub fn from_record(record: MessageRecord) -> Option<Self> {
        let from = record.from?;
        Some(Self {
            date: record.date,
            from_name: from.display_name,
            from_email: from.email,
            from_username: from.local_part,
            from_domain: from.domain,
            to: record.to,
        })
    }

    /// Cells in [`COLUMNS`] order
    pub fn cells(&self) -> [&str; 6] {
        [
            self.date.as_str(),
            self.from_name.as_str(),
            self.from_email.as_str(),
            self.from_username.as_str(),
            self.from_domain.as_str(),
            self.to.as_str(),
        ]
    }
}

/// Label info returned from Gmail API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// A name/value pair from a message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of `users.messages.list`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub message_ids: Vec<String>,
    pub next_page_token: Option<String>,
}
