//! In-memory fakes shared by the crate's tests. They mirror the Postgres
//! repositories' contracts closely enough that engine and importer tests
//! exercise the same semantics the production wiring sees.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use rolo_common::error::{RoloError, RoloResult};
use rolo_db::entity::models::{Contact, ContactPatch, InteractionRecord, Organization};
use rolo_db::entity::repositories::{
    ContactRepository, InteractionRepository, OrganizationRepository,
};
use rolo_db::sync::models::{EntityType, SyncState, SyncStatus};
use rolo_db::sync::repositories::{SyncLedgerRepository, SyncStateRepository};

use crate::connector::{FetchMode, SourceError, SourcePage};

#[derive(Clone, Default)]
pub struct MemStateRepo {
    states: Arc<Mutex<HashMap<String, SyncState>>>,
}

impl MemStateRepo {
    pub fn seed(
        &self,
        source: &str,
        cursor: Option<&str>,
        last_synced_at: Option<DateTime<Utc>>,
    ) {
        let mut states = self.states.lock().unwrap();
        states.insert(
            source.to_string(),
            SyncState {
                id: Uuid::new_v4(),
                source: source.to_string(),
                status: SyncStatus::Idle,
                cursor: cursor.map(|c| c.to_string()),
                last_synced_at,
                error_message: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
    }

    pub fn seed_syncing(&self, source: &str) {
        self.seed(source, None, None);
        let mut states = self.states.lock().unwrap();
        states.get_mut(source).unwrap().status = SyncStatus::Syncing;
    }

    pub fn get(&self, source: &str) -> SyncState {
        self.states
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .expect("state should exist")
    }
}

#[async_trait]
impl SyncStateRepository for MemStateRepo {
    async fn get_or_create(&self, source: &str) -> RoloResult<SyncState> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(source.to_string())
            .or_insert_with(|| SyncState {
                id: Uuid::new_v4(),
                source: source.to_string(),
                status: SyncStatus::Idle,
                cursor: None,
                last_synced_at: None,
                error_message: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        Ok(state.clone())
    }

    async fn acquire_lock(&self, source: &str) -> RoloResult<Option<SyncState>> {
        let mut states = self.states.lock().unwrap();
        match states.get_mut(source) {
            Some(state) if state.status != SyncStatus::Syncing => {
                state.status = SyncStatus::Syncing;
                state.error_message = None;
                state.updated_at = Utc::now();
                Ok(Some(state.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_completed(&self, id: Uuid, cursor: Option<&str>) -> RoloResult<SyncState> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .values_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RoloError::NotFound(format!("sync state {id}")))?;
        state.status = SyncStatus::Idle;
        state.last_synced_at = Some(Utc::now());
        if let Some(cursor) = cursor {
            state.cursor = Some(cursor.to_string());
        }
        state.error_message = None;
        state.updated_at = Utc::now();
        Ok(state.clone())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RoloResult<SyncState> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .values_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RoloError::NotFound(format!("sync state {id}")))?;
        state.status = SyncStatus::Error;
        state.error_message = Some(error_message.to_string());
        state.updated_at = Utc::now();
        Ok(state.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemLedger {
    entries: Arc<Mutex<HashMap<(String, String), (EntityType, Uuid)>>>,
}

impl MemLedger {
    pub fn seed(&self, source: &str, external_id: &str) {
        self.entries.lock().unwrap().insert(
            (source.to_string(), external_id.to_string()),
            (EntityType::Interaction, Uuid::new_v4()),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn contains(&self, source: &str, external_id: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .contains_key(&(source.to_string(), external_id.to_string()))
    }

    pub fn entity_for(&self, source: &str, external_id: &str) -> Option<(EntityType, Uuid)> {
        self.entries
            .lock()
            .unwrap()
            .get(&(source.to_string(), external_id.to_string()))
            .copied()
    }
}

#[async_trait]
impl SyncLedgerRepository for MemLedger {
    async fn exists(&self, source: &str, external_id: &str) -> RoloResult<bool> {
        Ok(self.contains(source, external_id))
    }

    async fn record(
        &self,
        source: &str,
        external_id: &str,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> RoloResult<()> {
        self.entries
            .lock()
            .unwrap()
            .entry((source.to_string(), external_id.to_string()))
            .or_insert((entity_type, entity_id));
        Ok(())
    }
}

/// A connector fed a fixed script of page results. Records which fetch
/// modes the engine asked for.
pub struct ScriptedSource<R> {
    pages: Arc<Mutex<VecDeque<Result<SourcePage<R>, SourceError>>>>,
    modes: Arc<Mutex<Vec<FetchMode>>>,
}

impl<R> Clone for ScriptedSource<R> {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            modes: Arc::clone(&self.modes),
        }
    }
}

impl<R: Clone> ScriptedSource<R> {
    pub fn new(pages: Vec<Result<SourcePage<R>, SourceError>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages.into())),
            modes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn next_page(
        &self,
        mode: &FetchMode,
        _page_token: Option<&str>,
    ) -> Result<SourcePage<R>, SourceError> {
        self.modes.lock().unwrap().push(mode.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SourcePage::last(Vec::new(), None)))
    }

    pub fn seen_modes(&self) -> Vec<FetchMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MemContactRepo {
    contacts: Arc<Mutex<Vec<Contact>>>,
}

impl MemContactRepo {
    pub fn seed(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    pub fn len(&self) -> usize {
        self.contacts.lock().unwrap().len()
    }

    pub fn by_email(&self, email: &str) -> Option<Contact> {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email == email)
            .cloned()
    }

    pub fn by_id(&self, id: Uuid) -> Option<Contact> {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.is_empty())
}

#[async_trait]
impl ContactRepository for MemContactRepo {
    async fn list_all(&self) -> RoloResult<Vec<Contact>> {
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn create(&self, contact: Contact) -> RoloResult<Contact> {
        let mut contacts = self.contacts.lock().unwrap();
        if let Some(existing) = contacts.iter().find(|c| c.email == contact.email) {
            return Ok(existing.clone());
        }
        contacts.push(contact.clone());
        Ok(contact)
    }

    async fn enrich(&self, id: Uuid, patch: ContactPatch) -> RoloResult<()> {
        let mut contacts = self.contacts.lock().unwrap();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RoloError::NotFound(format!("contact {id}")))?;

        if contact.display_name.is_empty() {
            if let Some(name) = &patch.display_name {
                contact.display_name = name.clone();
            }
        }
        if is_blank(&contact.phone) {
            contact.phone = patch.phone.or(contact.phone.take());
        }
        if contact.organization_id.is_none() {
            contact.organization_id = patch.organization_id;
        }
        if is_blank(&contact.notes) {
            contact.notes = patch.notes.or(contact.notes.take());
        }
        contact.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_contacted(&self, id: Uuid, ts: DateTime<Utc>) -> RoloResult<()> {
        let mut contacts = self.contacts.lock().unwrap();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RoloError::NotFound(format!("contact {id}")))?;
        if contact.last_contacted_at.map_or(true, |prev| ts > prev) {
            contact.last_contacted_at = Some(ts);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemOrgRepo {
    organizations: Arc<Mutex<Vec<Organization>>>,
}

impl MemOrgRepo {
    pub fn len(&self) -> usize {
        self.organizations.lock().unwrap().len()
    }

    pub fn by_name(&self, name: &str) -> Option<Organization> {
        self.organizations
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.name == name)
            .cloned()
    }
}

#[async_trait]
impl OrganizationRepository for MemOrgRepo {
    async fn find_or_create(&self, name: &str, domain: Option<&str>) -> RoloResult<Organization> {
        let mut organizations = self.organizations.lock().unwrap();
        if let Some(existing) = organizations.iter().find(|o| o.name == name) {
            return Ok(existing.clone());
        }
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.map(|d| d.to_string()),
            created_at: Utc::now(),
        };
        organizations.push(org.clone());
        Ok(org)
    }
}

#[derive(Clone, Default)]
pub struct MemInteractionRepo {
    interactions: Arc<Mutex<Vec<InteractionRecord>>>,
}

impl MemInteractionRepo {
    pub fn len(&self) -> usize {
        self.interactions.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<InteractionRecord> {
        self.interactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionRepository for MemInteractionRepo {
    async fn append(&self, interaction: InteractionRecord) -> RoloResult<InteractionRecord> {
        self.interactions.lock().unwrap().push(interaction.clone());
        Ok(interaction)
    }
}
