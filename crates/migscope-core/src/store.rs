//! Application state store.
//!
//! The one mutable snapshot of loaded data. Mutation goes through `apply`
//! (whole-payload replacement) and `set_active_dataset`; everything else
//! reads.

use chrono::{DateTime, Utc};

use crate::types::{DatasetKey, LoadPayload, Record};

/// Issued when a load starts; presented again when its result is applied.
///
/// Tickets increase strictly, so a result from an earlier-started load can
/// be recognized and dropped once a later-started one has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    summary: Option<Record>,
    contacts: Vec<Record>,
    chats: Vec<Record>,
    messages: Vec<Record>,
    active: DatasetKey,
    source_label: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    issued: u64,
    last_applied: u64,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace summary and all three datasets with `payload`.
    ///
    /// If the active dataset ends up empty, the first non-empty dataset in
    /// declared order becomes active, or `contacts` when all are empty.
    pub fn apply(&mut self, payload: LoadPayload, source_label: impl Into<String>) {
        let LoadPayload {
            summary,
            contacts,
            chats,
            messages,
        } = payload;

        self.summary = summary;
        self.contacts = contacts;
        self.chats = chats;
        self.messages = messages;
        self.source_label = Some(source_label.into());
        self.loaded_at = Some(Utc::now());

        if self.count(self.active) == 0 {
            self.active = DatasetKey::ALL
                .into_iter()
                .find(|k| self.count(*k) > 0)
                .unwrap_or_default();
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Apply `payload` unless a load started after `ticket` was already applied.
    ///
    /// Returns whether the payload was applied.
    pub fn apply_ticketed(
        &mut self,
        ticket: LoadTicket,
        payload: LoadPayload,
        source_label: impl Into<String>,
    ) -> bool {
        if ticket.0 < self.last_applied {
            return false;
        }
        self.last_applied = ticket.0;
        self.apply(payload, source_label);
        true
    }

    /// Switch the active dataset by name. Unknown names are ignored.
    pub fn set_active_dataset(&mut self, key: &str) -> bool {
        match key.parse::<DatasetKey>() {
            Ok(key) => {
                self.set_active(key);
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_active(&mut self, key: DatasetKey) {
        self.active = key;
    }

    pub fn summary(&self) -> Option<&Record> {
        self.summary.as_ref()
    }

    pub fn records(&self, key: DatasetKey) -> &[Record] {
        match key {
            DatasetKey::Contacts => &self.contacts,
            DatasetKey::Chats => &self.chats,
            DatasetKey::Messages => &self.messages,
        }
    }

    pub fn count(&self, key: DatasetKey) -> usize {
        self.records(key).len()
    }

    pub fn active(&self) -> DatasetKey {
        self.active
    }

    pub fn active_records(&self) -> &[Record] {
        self.records(self.active)
    }

    /// True when a summary or at least one record is loaded.
    pub fn has_data(&self) -> bool {
        self.summary.is_some() || DatasetKey::ALL.iter().any(|k| self.count(*k) > 0)
    }

    pub fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
