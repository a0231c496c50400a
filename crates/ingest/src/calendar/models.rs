//! Wire shapes for calendar event listings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Event start time. Timed events carry `dateTime`; all-day events carry
/// only `date` (a plain `YYYY-MM-DD`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub response_status: Option<String>,
    /// Marks the calendar owner's own attendee entry.
    #[serde(default, rename = "self")]
    pub is_self: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref()?.date_time
    }

    /// The first attendee other than the calendar owner that has an email
    /// address. This is the contact the meeting is attributed to.
    pub fn counterpart(&self) -> Option<&Attendee> {
        self.attendees
            .iter()
            .find(|a| !a.is_self && a.email.as_deref().is_some_and(|e| !e.trim().is_empty()))
    }

    /// The owner's own response, when their attendee entry is present.
    pub fn own_response(&self) -> Option<&str> {
        self.attendees
            .iter()
            .find(|a| a.is_self)
            .and_then(|a| a.response_status.as_deref())
    }
}
