//! Ingestion session: the only writer of the shared state store.
//!
//! Every surface (HTTP dashboard, terminal console, startup autoload) goes
//! through a `Session`, so each load is applied with the same ticketing,
//! logging and status-notice rules.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};

use migscope_core::{LoadPayload, LoadTicket, LogRing, StateStore};

use crate::loader::{LocalFiles, ResourceLoader};
use crate::self_test::SelfTestClient;
use crate::{LoadError, SelfTestError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeTone {
    Info,
    Success,
    Warning,
    Error,
}

/// The status line shown to the user after the last action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub tone: NoticeTone,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Session {
    store: Arc<RwLock<StateStore>>,
    log: LogRing,
    loader: ResourceLoader,
    self_test: SelfTestClient,
    notice: Arc<RwLock<Option<Notice>>>,
    last_prefix: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new(loader: ResourceLoader, self_test: SelfTestClient, log: LogRing) -> Self {
        Self {
            store: Arc::new(RwLock::new(StateStore::new())),
            log,
            loader,
            self_test,
            notice: Arc::new(RwLock::new(None)),
            last_prefix: Arc::new(RwLock::new(None)),
        }
    }

    /// Read access to the current snapshot.
    pub async fn read(&self) -> RwLockReadGuard<'_, StateStore> {
        self.store.read().await
    }

    pub fn log(&self) -> &LogRing {
        &self.log
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.notice.read().await.clone()
    }

    pub async fn last_prefix(&self) -> Option<String> {
        self.last_prefix.read().await.clone()
    }

    pub fn self_test_url(&self) -> String {
        self.self_test.url().to_string()
    }

    /// Load everything stored under `prefix` and apply it.
    ///
    /// Returns whether the result was applied; `false` means a load started
    /// later had already been applied.
    pub async fn load_prefix(&self, prefix: &str) -> Result<bool, LoadError> {
        let prefix = prefix.trim().to_string();
        if !prefix.is_empty() {
            *self.last_prefix.write().await = Some(prefix.clone());
        }

        let ticket = self.store.write().await.begin_load();
        match self.loader.load_prefix(&prefix).await {
            Ok(payload) => Ok(self.finish(ticket, payload, format!("prefix '{prefix}'")).await),
            Err(e) => {
                self.reject(&e).await;
                Err(e)
            }
        }
    }

    /// Load the selected local files and apply them.
    pub async fn load_files(&self, files: &LocalFiles) -> Result<bool, LoadError> {
        let ticket = self.store.write().await.begin_load();
        match self.loader.load_files(files).await {
            Ok(payload) => Ok(self.finish(ticket, payload, "local files".to_string()).await),
            Err(e) => {
                self.reject(&e).await;
                Err(e)
            }
        }
    }

    /// Call the self-test endpoint; on failure the store is left untouched.
    pub async fn run_self_test(&self) -> Result<bool, SelfTestError> {
        let ticket = self.store.write().await.begin_load();
        self.log
            .info(format!("Running self-test at {}", self.self_test.url()));

        match self.self_test.run().await {
            Ok(payload) => Ok(self.finish(ticket, payload, "self-test".to_string()).await),
            Err(e) => {
                self.log.error("Self-test failed", e.to_string());
                self.set_notice(NoticeTone::Error, format!("Self-test failed: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    /// Switch the active dataset. Unknown keys leave the selection unchanged.
    pub async fn select_dataset(&self, key: &str) -> bool {
        let changed = self.store.write().await.set_active_dataset(key);
        if !changed {
            self.log.warn(format!("Unknown dataset '{key}'"));
        }
        changed
    }

    async fn finish(&self, ticket: LoadTicket, payload: LoadPayload, label: String) -> bool {
        let counts = payload.count_line();
        let empty = payload.is_empty();

        let applied = self
            .store
            .write()
            .await
            .apply_ticketed(ticket, payload, label.clone());

        if !applied {
            self.log.warn(format!(
                "Discarded result of {label}: a newer load was already applied"
            ));
            return false;
        }

        self.log.success(format!("Loaded {label}: {counts}"));
        if empty {
            self.set_notice(NoticeTone::Warning, format!("Nothing found for {label}"))
                .await;
        } else {
            self.set_notice(NoticeTone::Success, format!("Loaded {label} ({counts})"))
                .await;
        }
        true
    }

    async fn reject(&self, error: &LoadError) {
        if error.is_user_error() {
            self.log.warn(error.to_string());
            self.set_notice(NoticeTone::Warning, error.to_string()).await;
        } else {
            self.log.error("Load failed", error.to_string());
            self.set_notice(NoticeTone::Error, format!("Load failed: {error}"))
                .await;
        }
    }

    async fn set_notice(&self, tone: NoticeTone, text: String) {
        *self.notice.write().await = Some(Notice {
            tone,
            text,
            at: Utc::now(),
        });
    }
}
