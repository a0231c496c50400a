//! RFC 5322-ish header field parsing, only as deep as the importer needs:
//! mailbox addresses with optional display names, comma-separated address
//! lists, and Date header values.

use chrono::{DateTime, Utc};

use crate::identity::normalize_email;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub email: String,
    pub display_name: Option<String>,
}

/// Parse `Display Name <user@host>`, `<user@host>`, or a bare address.
/// The address comes back normalized (trimmed, lowercased).
pub fn parse_address(raw: &str) -> Option<ParsedAddress> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(open) = raw.rfind('<') {
        let close = raw[open..].find('>')? + open;
        let email = normalize_email(&raw[open + 1..close]);
        if !email.contains('@') {
            return None;
        }
        let name = raw[..open].trim().trim_matches('"').trim();
        let display_name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        return Some(ParsedAddress {
            email,
            display_name,
        });
    }

    let email = normalize_email(raw);
    if email.contains('@') {
        Some(ParsedAddress {
            email,
            display_name: None,
        })
    } else {
        None
    }
}

/// Parse a To/Cc style list, splitting on commas outside double quotes so
/// `"Doe, Jane" <jane@x>` stays one entry.
pub fn parse_address_list(raw: &str) -> Vec<ParsedAddress> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                if let Some(addr) = parse_address(&current) {
                    out.push(addr);
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if let Some(addr) = parse_address(&current) {
        out.push(addr);
    }

    out
}

/// Parse an RFC 2822 Date header. Trailing comments like `(UTC)` are
/// stripped first; chrono rejects them.
pub fn parse_rfc2822_date(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = match raw.find('(') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc2822(cleaned.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
