//! Per-source noise filters. Each check classifies a record as worth
//! importing or returns the specific reason it was rejected; reasons feed
//! the run summary tallies.

use crate::calendar::models::CalendarEvent;
use crate::engine::SkipReason;
use crate::mailbox::models::MailMessage;

/// Local-part prefixes of addresses that never belong to a person.
const AUTOMATED_SENDER_PREFIXES: &[&str] = &[
    "no-reply",
    "noreply",
    "no_reply",
    "do-not-reply",
    "donotreply",
    "mailer-daemon",
    "postmaster",
    "bounce",
    "bounces",
];

/// Substrings in the local part that mark notification and marketing
/// senders.
const AUTOMATED_SENDER_FRAGMENTS: &[&str] = &[
    "notification",
    "newsletter",
    "marketing",
    "unsubscribe",
];

/// Subject prefixes produced by calendar tooling rather than a human.
const SCHEDULING_SUBJECT_PREFIXES: &[&str] = &[
    "invitation:",
    "updated invitation:",
    "accepted:",
    "declined:",
    "tentatively accepted:",
    "canceled event:",
    "cancelled event:",
];

/// Subject substrings of auto-replies and delivery reports.
const AUTO_SUBJECT_PATTERNS: &[&str] = &[
    "automatic reply",
    "auto-reply",
    "autoreply",
    "out of office",
    "delivery status notification",
    "delivery failure",
    "undeliverable",
    "undelivered mail",
    "returned mail",
    "failure notice",
];

/// Mailbox noise filter. A message passing every check is high-signal
/// personal correspondence.
#[derive(Debug, Clone)]
pub struct MailboxFilter {
    /// Combined To+Cc count above which a message is treated as a
    /// broadcast rather than a personal exchange.
    pub broadcast_recipient_limit: usize,
}

impl Default for MailboxFilter {
    fn default() -> Self {
        Self {
            broadcast_recipient_limit: 4,
        }
    }
}

impl MailboxFilter {
    pub fn check(&self, message: &MailMessage) -> Result<(), SkipReason> {
        if message
            .from_address()
            .is_some_and(|addr| is_automated_sender(&addr.email))
        {
            return Err(SkipReason::AutomatedSender);
        }
        if message.recipient_count() > self.broadcast_recipient_limit {
            return Err(SkipReason::BroadcastRecipients);
        }
        if is_calendar_invite(message) {
            return Err(SkipReason::CalendarInvite);
        }
        if is_auto_generated_subject(message.subject()) {
            return Err(SkipReason::AutoGeneratedSubject);
        }
        Ok(())
    }
}

fn is_automated_sender(email: &str) -> bool {
    let local = email.split('@').next().unwrap_or(email).to_lowercase();
    AUTOMATED_SENDER_PREFIXES
        .iter()
        .any(|p| local.starts_with(p))
        || AUTOMATED_SENDER_FRAGMENTS
            .iter()
            .any(|f| local.contains(f))
}

fn is_calendar_invite(message: &MailMessage) -> bool {
    if message
        .mime_type()
        .is_some_and(|m| m.to_lowercase().contains("calendar"))
    {
        return true;
    }
    let subject = message.subject().to_lowercase();
    SCHEDULING_SUBJECT_PREFIXES
        .iter()
        .any(|p| subject.starts_with(p))
}

fn is_auto_generated_subject(subject: &str) -> bool {
    let subject = subject.trim().to_lowercase();
    if subject.chars().count() < 3 {
        return true;
    }
    AUTO_SUBJECT_PATTERNS.iter().any(|p| subject.contains(p))
}

/// Calendar noise filter. Checks run in a fixed order so the reported
/// reason is stable for a given event.
pub fn check_event(event: &CalendarEvent) -> Result<(), SkipReason> {
    if event.id.trim().is_empty() {
        return Err(SkipReason::MissingEvent);
    }
    let Some(start) = event.start.as_ref() else {
        return Err(SkipReason::MissingStart);
    };
    if start.date_time.is_none() {
        if start.date.is_some() {
            return Err(SkipReason::AllDayEvent);
        }
        return Err(SkipReason::MissingStart);
    }
    if event.status.as_deref() == Some("cancelled") {
        return Err(SkipReason::CancelledEvent);
    }
    if event.own_response() == Some("declined") {
        return Err(SkipReason::DeclinedEvent);
    }
    if event.attendees.len() <= 1 {
        return Err(SkipReason::SoloEvent);
    }
    Ok(())
}
