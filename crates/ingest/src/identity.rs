use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use rolo_common::error::{RoloError, RoloResult};
use rolo_db::entity::models::Contact;
use rolo_db::entity::repositories::{ContactRepository, OrganizationRepository};

/// Identity key normalization: matching is exact on the trimmed,
/// case-folded address. No name-based fuzzy matching.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn email_domain(email: &str) -> Option<&str> {
    let domain = email.rsplit_once('@')?.1;
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// Public/consumer mail providers. Addresses here never imply an
/// organization.
const CONSUMER_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "ymail.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "mac.com",
    "protonmail.com",
    "proton.me",
    "pm.me",
    "gmx.com",
    "gmx.net",
    "mail.com",
    "zoho.com",
    "fastmail.com",
    "hey.com",
    "yandex.com",
    "yandex.ru",
    "qq.com",
    "163.com",
    "126.com",
    "web.de",
    "t-online.de",
    "comcast.net",
    "verizon.net",
    "att.net",
];

pub fn is_consumer_domain(domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    CONSUMER_MAIL_DOMAINS.iter().any(|d| *d == domain)
}

// Trailing labels stripped before deriving an organization name.
const TLD_LABELS: &[&str] = &[
    "com", "net", "org", "io", "co", "ai", "dev", "app", "tech", "info", "biz", "uk", "us", "de",
    "fr", "au", "ca", "in", "jp", "nl", "se", "ch", "eu",
];

/// Derive a display-worthy organization name from an email domain:
/// `bright-labs.co.uk` → `Bright Labs`. Returns `None` when nothing
/// usable remains after stripping suffixes.
pub fn derive_org_name(domain: &str) -> Option<String> {
    let domain = domain.trim().to_lowercase();
    let mut labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();

    while labels.len() > 1 && TLD_LABELS.contains(labels.last()?) {
        labels.pop();
    }

    // Subdomains like mail.acme.com: keep the registrable label.
    let core = labels.last()?;
    if core.is_empty() || TLD_LABELS.contains(core) {
        return None;
    }

    let name = core
        .split(['-', '_'])
        .filter(|seg| !seg.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Session-scoped index of normalized email → contact id. Built once per
/// run from a snapshot supplied by the caller; never shared across runs.
pub struct IdentityMatcher {
    by_email: HashMap<String, Uuid>,
}

impl IdentityMatcher {
    pub fn from_contacts(snapshot: &[Contact]) -> Self {
        let by_email = snapshot
            .iter()
            .map(|c| (normalize_email(&c.email), c.id))
            .collect();
        Self { by_email }
    }

    pub fn find_match(&self, email: &str) -> Option<Uuid> {
        self.by_email.get(&normalize_email(email)).copied()
    }

    /// Must be called right after creating a contact so a later record in
    /// the same run resolves to it instead of creating a duplicate.
    pub fn add_contact(&mut self, email: &str, contact_id: Uuid) {
        self.by_email.insert(normalize_email(email), contact_id);
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

/// Outcome of resolving an external contact reference.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub contact_id: Uuid,
    pub created: bool,
}

/// Matcher plus the entity store: resolves an email to an existing contact
/// or creates one, inferring an organization where the domain allows it.
pub struct IdentityResolver<C, O> {
    matcher: IdentityMatcher,
    contacts: Arc<C>,
    organizations: Arc<O>,
}

impl<C, O> IdentityResolver<C, O>
where
    C: ContactRepository,
    O: OrganizationRepository,
{
    pub fn new(matcher: IdentityMatcher, contacts: Arc<C>, organizations: Arc<O>) -> Self {
        Self {
            matcher,
            contacts,
            organizations,
        }
    }

    pub fn find(&self, email: &str) -> Option<Uuid> {
        self.matcher.find_match(email)
    }

    /// Find-or-create the organization for a contact: an explicitly stated
    /// name wins; otherwise infer from the email domain unless it is a
    /// consumer provider.
    pub async fn ensure_organization(
        &self,
        explicit_name: Option<&str>,
        email: &str,
    ) -> RoloResult<Option<Uuid>> {
        if let Some(name) = explicit_name.map(str::trim).filter(|n| !n.is_empty()) {
            let domain = email_domain(email).filter(|d| !is_consumer_domain(d));
            let org = self.organizations.find_or_create(name, domain).await?;
            return Ok(Some(org.id));
        }

        let Some(domain) = email_domain(email) else {
            return Ok(None);
        };
        if is_consumer_domain(domain) {
            return Ok(None);
        }
        let Some(name) = derive_org_name(domain) else {
            return Ok(None);
        };

        let org = self.organizations.find_or_create(&name, Some(domain)).await?;
        Ok(Some(org.id))
    }

    pub async fn resolve_or_create(
        &mut self,
        email: &str,
        display_name: Option<&str>,
        explicit_org: Option<&str>,
    ) -> RoloResult<Resolution> {
        let normalized = normalize_email(email);
        if normalized.is_empty() || !normalized.contains('@') {
            return Err(RoloError::Validation(format!(
                "not a usable contact email: {email:?}"
            )));
        }

        if let Some(contact_id) = self.matcher.find_match(&normalized) {
            return Ok(Resolution {
                contact_id,
                created: false,
            });
        }

        let organization_id = self.ensure_organization(explicit_org, &normalized).await?;

        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            // Fall back to the local part when the source gave no name.
            .unwrap_or_else(|| normalized.split('@').next().unwrap_or_default().to_string());

        let now = Utc::now();
        let contact = self
            .contacts
            .create(Contact {
                id: Uuid::new_v4(),
                display_name,
                email: normalized.clone(),
                phone: None,
                organization_id,
                notes: None,
                last_contacted_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.matcher.add_contact(&contact.email, contact.id);

        Ok(Resolution {
            contact_id: contact.id,
            created: true,
        })
    }
}
