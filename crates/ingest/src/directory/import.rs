//! Contacts-directory source: enriches the local contact book with the
//! directory's richer profile data. Directory entries produce no
//! interaction history, only contact and organization writes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use rolo_config::AppConfig;
use rolo_db::entity::models::ContactPatch;
use rolo_db::entity::repositories::{ContactRepository, OrganizationRepository};
use rolo_db::sync::models::EntityType;

use crate::connector::{FetchMode, SourceConnector, SourceError, SourcePage};
use crate::engine::{RecordFailure, RecordImporter, RecordOutcome, SkipReason};
use crate::identity::{normalize_email, IdentityResolver};

use super::models::DirectoryPerson;

#[derive(Debug, Clone)]
pub struct DirectoryImportConfig {
    pub lookback_days: u32,
}

impl Default for DirectoryImportConfig {
    fn default() -> Self {
        Self { lookback_days: 365 }
    }
}

impl DirectoryImportConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            lookback_days: config.directory_lookback_days,
        }
    }
}

pub struct DirectoryImporter<X, C, O> {
    connector: X,
    resolver: IdentityResolver<C, O>,
    contacts: Arc<C>,
    lookback_days: u32,
}

impl<X, C, O> DirectoryImporter<X, C, O>
where
    X: SourceConnector<Record = DirectoryPerson>,
    C: ContactRepository,
    O: OrganizationRepository,
{
    pub fn new(
        connector: X,
        resolver: IdentityResolver<C, O>,
        contacts: Arc<C>,
        config: DirectoryImportConfig,
    ) -> Self {
        Self {
            connector,
            resolver,
            contacts,
            lookback_days: config.lookback_days,
        }
    }
}

#[async_trait]
impl<X, C, O> RecordImporter for DirectoryImporter<X, C, O>
where
    X: SourceConnector<Record = DirectoryPerson>,
    C: ContactRepository,
    O: OrganizationRepository,
{
    type Record = DirectoryPerson;

    fn source_name(&self) -> &'static str {
        "directory"
    }

    fn bootstrap_window(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }

    async fn list_page(
        &self,
        mode: &FetchMode,
        page_token: Option<&str>,
    ) -> Result<SourcePage<DirectoryPerson>, SourceError> {
        self.connector.list_page(mode, page_token).await
    }

    fn record_id(&self, record: &DirectoryPerson) -> String {
        record.id.clone()
    }

    async fn import_record(
        &mut self,
        person: &DirectoryPerson,
    ) -> Result<RecordOutcome, RecordFailure> {
        let Some(email) = person.primary_email() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingEmail));
        };
        let email = normalize_email(email);

        // A known address means enrichment only. Blank local fields are
        // filled in; populated ones are left alone.
        if let Some(contact_id) = self.resolver.find(&email) {
            let organization_id = self
                .resolver
                .ensure_organization(person.organization.as_deref(), &email)
                .await
                .map_err(|e| RecordFailure(e.to_string()))?;

            let patch = ContactPatch {
                display_name: person.display_name.clone(),
                phone: person.primary_phone().map(str::to_string),
                organization_id,
                notes: person.notes.clone(),
            };
            if !patch.is_empty() {
                self.contacts
                    .enrich(contact_id, patch)
                    .await
                    .map_err(|e| RecordFailure(e.to_string()))?;
            }

            return Ok(RecordOutcome::Applied {
                entity_type: EntityType::Contact,
                entity_id: contact_id,
            });
        }

        let resolution = self
            .resolver
            .resolve_or_create(
                &email,
                person.display_name.as_deref(),
                person.organization.as_deref(),
            )
            .await
            .map_err(|e| RecordFailure(e.to_string()))?;

        let patch = ContactPatch {
            display_name: None,
            phone: person.primary_phone().map(str::to_string),
            organization_id: None,
            notes: person.notes.clone(),
        };
        if !patch.is_empty() {
            self.contacts
                .enrich(resolution.contact_id, patch)
                .await
                .map_err(|e| RecordFailure(e.to_string()))?;
        }

        Ok(RecordOutcome::Applied {
            entity_type: EntityType::Contact,
            entity_id: resolution.contact_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use rolo_db::entity::models::Contact;

    use crate::engine::SyncEngine;
    use crate::identity::IdentityMatcher;
    use crate::testutil::{
        MemContactRepo, MemLedger, MemOrgRepo, MemStateRepo, ScriptedSource,
    };

    use super::*;

    struct FakeDirectory {
        listing: ScriptedSource<DirectoryPerson>,
    }

    #[async_trait]
    impl SourceConnector for FakeDirectory {
        type Record = DirectoryPerson;

        async fn list_page(
            &self,
            mode: &FetchMode,
            page_token: Option<&str>,
        ) -> Result<SourcePage<DirectoryPerson>, SourceError> {
            self.listing.next_page(mode, page_token)
        }
    }

    fn person(value: serde_json::Value) -> DirectoryPerson {
        serde_json::from_value(value).unwrap()
    }

    struct Harness {
        engine: SyncEngine<MemStateRepo, MemLedger>,
        ledger: MemLedger,
        contacts: Arc<MemContactRepo>,
        organizations: Arc<MemOrgRepo>,
    }

    impl Harness {
        fn new() -> Self {
            let states = MemStateRepo::default();
            let ledger = MemLedger::default();
            Self {
                engine: SyncEngine::new(states, ledger.clone()),
                ledger,
                contacts: Arc::new(MemContactRepo::default()),
                organizations: Arc::new(MemOrgRepo::default()),
            }
        }

        async fn importer(
            &self,
            people: Vec<DirectoryPerson>,
        ) -> DirectoryImporter<FakeDirectory, MemContactRepo, MemOrgRepo> {
            let connector = FakeDirectory {
                listing: ScriptedSource::new(vec![Ok(SourcePage::last(people, None))]),
            };
            let snapshot = self.contacts.list_all().await.unwrap();
            let resolver = IdentityResolver::new(
                IdentityMatcher::from_contacts(&snapshot),
                Arc::clone(&self.contacts),
                Arc::clone(&self.organizations),
            );
            DirectoryImporter::new(
                connector,
                resolver,
                Arc::clone(&self.contacts),
                DirectoryImportConfig::default(),
            )
        }
    }

    fn bare_contact(email: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            display_name: String::new(),
            email: email.to_string(),
            phone: None,
            organization_id: None,
            notes: None,
            last_contacted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_person_becomes_a_full_contact() {
        let h = Harness::new();
        let mut importer = h
            .importer(vec![person(json!({
                "id": "p-1",
                "displayName": "Bob Jones",
                "emailAddresses": ["Bob@Acme.com"],
                "phoneNumbers": ["+1 555 0100"],
                "organization": "Acme Corp",
                "notes": "met at the Berlin meetup"
            }))])
            .await;

        let summary = h.engine.run(&mut importer, true).await.unwrap();
        assert_eq!(summary.processed, 1);

        let contact = h.contacts.by_email("bob@acme.com").unwrap();
        assert_eq!(contact.display_name, "Bob Jones");
        assert_eq!(contact.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(contact.notes.as_deref(), Some("met at the Berlin meetup"));

        // The stated organization wins over domain inference.
        let org = h.organizations.by_name("Acme Corp").unwrap();
        assert_eq!(contact.organization_id, Some(org.id));
        assert!(h.organizations.by_name("Acme").is_none());

        assert_eq!(
            h.ledger.entity_for("directory", "p-1").unwrap().0,
            EntityType::Contact
        );
    }

    #[tokio::test]
    async fn known_contact_is_enriched_without_overwriting() {
        let h = Harness::new();
        let mut seeded = bare_contact("bob@acme.com");
        seeded.display_name = "Bob".to_string();
        seeded.phone = Some("+1 555 9999".to_string());
        let seeded_id = seeded.id;
        h.contacts.seed(seeded);

        let mut importer = h
            .importer(vec![person(json!({
                "id": "p-1",
                "displayName": "Robert Jones",
                "emailAddresses": ["bob@acme.com"],
                "phoneNumbers": ["+1 555 0100"],
                "notes": "prefers afternoon calls"
            }))])
            .await;

        let summary = h.engine.run(&mut importer, true).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(h.contacts.len(), 1);

        let contact = h.contacts.by_id(seeded_id).unwrap();
        // Populated fields stay, blanks get filled.
        assert_eq!(contact.display_name, "Bob");
        assert_eq!(contact.phone.as_deref(), Some("+1 555 9999"));
        assert_eq!(contact.notes.as_deref(), Some("prefers afternoon calls"));
    }

    #[tokio::test]
    async fn enrichment_fills_missing_organization() {
        let h = Harness::new();
        let seeded = bare_contact("bob@acme.com");
        let seeded_id = seeded.id;
        h.contacts.seed(seeded);

        let mut importer = h
            .importer(vec![person(json!({
                "id": "p-1",
                "emailAddresses": ["bob@acme.com"],
                "organization": "Acme Corp"
            }))])
            .await;

        h.engine.run(&mut importer, true).await.unwrap();

        let contact = h.contacts.by_id(seeded_id).unwrap();
        let org = h.organizations.by_name("Acme Corp").unwrap();
        assert_eq!(contact.organization_id, Some(org.id));
    }

    #[tokio::test]
    async fn person_without_email_is_skipped() {
        let h = Harness::new();
        let mut importer = h
            .importer(vec![person(json!({
                "id": "p-1",
                "displayName": "Badge Printer"
            }))])
            .await;

        let summary = h.engine.run(&mut importer, true).await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped_for(SkipReason::MissingEmail), 1);
        assert_eq!(h.contacts.len(), 0);
    }

    #[tokio::test]
    async fn second_run_skips_already_imported_people() {
        let h = Harness::new();
        let entry = json!({
            "id": "p-1",
            "displayName": "Bob Jones",
            "emailAddresses": ["bob@acme.com"]
        });

        let mut first = h.importer(vec![person(entry.clone())]).await;
        h.engine.run(&mut first, true).await.unwrap();

        let mut second = h.importer(vec![person(entry)]).await;
        let summary = h.engine.run(&mut second, false).await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped_for(SkipReason::AlreadyImported), 1);
        assert_eq!(h.contacts.len(), 1);
    }
}
