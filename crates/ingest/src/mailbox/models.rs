//! Wire shapes for mailbox listings and message detail payloads. Only the
//! metadata portion is modeled; message bodies are never fetched.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use super::headers::{parse_address, parse_address_list, parse_rfc2822_date, ParsedAddress};

/// Lightweight entry from a mailbox listing page. Full headers require a
/// follow-up detail fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Server receive time as epoch milliseconds, transported as a string.
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: MessagePayload,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl MailMessage {
    /// Header lookup by name, case-insensitive per RFC 5322.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or("")
    }

    pub fn from_address(&self) -> Option<ParsedAddress> {
        parse_address(self.header("From")?)
    }

    /// Direct recipients across To and Cc.
    pub fn recipient_count(&self) -> usize {
        let mut count = 0;
        for name in ["To", "Cc"] {
            if let Some(value) = self.header(name) {
                count += parse_address_list(value).len();
            }
        }
        count
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.payload.mime_type.as_deref()
    }

    /// When the message happened: the server receive timestamp when present,
    /// otherwise the sender-supplied Date header.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        if let Some(ms) = self
            .internal_date
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
        {
            if let Some(ts) = Utc.timestamp_millis_opt(ms).single() {
                return Some(ts);
            }
        }
        parse_rfc2822_date(self.header("Date")?)
    }
}
