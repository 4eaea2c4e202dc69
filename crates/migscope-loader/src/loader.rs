//! Resource loader.
//!
//! Two entry paths converge on a `LoadPayload`: a prefix resolved against
//! the configured data root, and a set of user-selected files. Resources
//! are read strictly in the order summary, contacts, chats, messages so
//! log lines come out in a stable order.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Client;

use migscope_core::{
    parse_ndjson, DatasetKey, LoadPayload, LogLevel, LogRing, Record,
    SUMMARY_FALLBACK_RESOURCE, SUMMARY_RESOURCE,
};

use crate::source::{decode_text, DataRoot, ResourceSource};
use crate::LoadError;

/// A file chosen by the user: a path on disk or an uploaded body.
#[derive(Debug, Clone)]
pub enum FileInput {
    Path(PathBuf),
    Upload { name: String, data: Bytes },
}

impl FileInput {
    pub fn name(&self) -> String {
        match self {
            FileInput::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            FileInput::Upload { name, .. } => name.clone(),
        }
    }

    pub async fn read_text(&self) -> Result<String, LoadError> {
        let bytes = match self {
            FileInput::Path(path) => tokio::fs::read(path).await?,
            FileInput::Upload { data, .. } => data.to_vec(),
        };
        decode_text(bytes, &self.name())
    }
}

/// Up to four selected files. Any subset may be present.
#[derive(Debug, Clone, Default)]
pub struct LocalFiles {
    pub summary: Option<FileInput>,
    pub contacts: Option<FileInput>,
    pub chats: Option<FileInput>,
    pub messages: Option<FileInput>,
}

impl LocalFiles {
    pub fn dataset(&self, key: DatasetKey) -> Option<&FileInput> {
        match key {
            DatasetKey::Contacts => self.contacts.as_ref(),
            DatasetKey::Chats => self.chats.as_ref(),
            DatasetKey::Messages => self.messages.as_ref(),
        }
    }

    pub fn set_dataset(&mut self, key: DatasetKey, input: FileInput) {
        let slot = match key {
            DatasetKey::Contacts => &mut self.contacts,
            DatasetKey::Chats => &mut self.chats,
            DatasetKey::Messages => &mut self.messages,
        };
        *slot = Some(input);
    }

    pub fn selected(&self) -> usize {
        usize::from(self.summary.is_some())
            + DatasetKey::ALL
                .iter()
                .filter(|k| self.dataset(**k).is_some())
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.selected() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ResourceLoader {
    root: DataRoot,
    client: Client,
    log: LogRing,
}

impl ResourceLoader {
    pub fn new(root: DataRoot, client: Client, log: LogRing) -> Self {
        Self { root, client, log }
    }

    /// Load everything stored under `prefix`.
    ///
    /// Only a blank or malformed prefix fails; unreachable or missing
    /// resources just leave their part of the payload empty.
    pub async fn load_prefix(&self, prefix: &str) -> Result<LoadPayload, LoadError> {
        let source = self.root.resolve(prefix, &self.client)?;
        self.log.info(format!(
            "Loading prefix '{}' from {}",
            prefix.trim(),
            source.locate("")
        ));
        Ok(load_from_source(source.as_ref(), &self.log).await)
    }

    /// Load the user-selected files.
    pub async fn load_files(&self, files: &LocalFiles) -> Result<LoadPayload, LoadError> {
        if files.is_empty() {
            return Err(LoadError::NoFilesSelected);
        }
        self.log
            .info(format!("Reading {} local file(s)", files.selected()));

        let mut payload = LoadPayload::default();

        if let Some(input) = &files.summary {
            if let Some(text) = self.read_input(input).await {
                payload.summary = decode_summary(&text, &input.name(), &self.log);
            }
        }

        for key in DatasetKey::ALL {
            let Some(input) = files.dataset(key) else {
                continue;
            };
            if let Some(text) = self.read_input(input).await {
                let name = input.name();
                let records = parse_ndjson(&text, Some(name.as_str()), &self.log);
                self.log
                    .info(format!("{name}: {} {} record(s)", records.len(), key));
                *payload.records_mut(key) = records;
            }
        }

        Ok(payload)
    }

    async fn read_input(&self, input: &FileInput) -> Option<String> {
        match input.read_text().await {
            Ok(text) => Some(text),
            Err(e) => {
                self.log
                    .error(format!("Could not read {}", input.name()), e.to_string());
                None
            }
        }
    }
}

/// Walk the summary and dataset fallback chains of one source.
pub async fn load_from_source(source: &dyn ResourceSource, log: &LogRing) -> LoadPayload {
    let mut payload = LoadPayload::default();
    let mut found = 0usize;

    // a summary that is null or unparseable does not end the chain
    for candidate in [SUMMARY_RESOURCE, SUMMARY_FALLBACK_RESOURCE] {
        if let Some((name, text)) = first_available(source, &[candidate], log).await {
            found += 1;
            payload.summary = decode_summary(&text, &name, log);
            if payload.summary.is_some() {
                break;
            }
        }
    }

    for key in DatasetKey::ALL {
        let candidates = [key.export_status_resource(), key.raw_resource()];
        let names: Vec<&str> = candidates.iter().map(String::as_str).collect();
        if let Some((name, text)) = first_available(source, &names, log).await {
            found += 1;
            *payload.records_mut(key) = parse_ndjson(&text, Some(name.as_str()), log);
        }
    }

    if found == 0 {
        log.warn(format!("Nothing found at {}", source.locate("")));
    }

    payload
}

/// Text of the first resource in `names` that exists and can be fetched.
async fn first_available(
    source: &dyn ResourceSource,
    names: &[&str],
    log: &LogRing,
) -> Option<(String, String)> {
    for name in names {
        match source.fetch_text(name).await {
            Ok(Some(text)) => {
                log.info(format!("Read {} ({} bytes)", source.locate(name), text.len()));
                return Some((name.to_string(), text));
            }
            Ok(None) => {
                tracing::debug!(resource = %source.locate(name), "resource not found");
            }
            Err(e) => {
                log.record(
                    LogLevel::Warn,
                    format!("Could not fetch {}", source.locate(name)),
                    Some(e.to_string()),
                );
            }
        }
    }
    None
}

fn decode_summary(text: &str, name: &str, log: &LogRing) -> Option<Record> {
    match serde_json::from_str::<Record>(text) {
        Ok(Record::Null) => {
            log.warn(format!("{name}: summary is null, ignored"));
            None
        }
        Ok(value) => Some(value),
        Err(e) => {
            log.error(format!("{name}: invalid summary JSON"), e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upload(name: &str, text: &str) -> FileInput {
        FileInput::Upload {
            name: name.to_string(),
            data: Bytes::from(text.to_string()),
        }
    }

    fn loader(log: &LogRing) -> ResourceLoader {
        ResourceLoader::new(DataRoot::Dir(PathBuf::from(".")), Client::new(), log.clone())
    }

    #[tokio::test]
    async fn no_files_is_rejected() {
        let log = LogRing::new();
        let err = loader(&log).load_files(&LocalFiles::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::NoFilesSelected));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn bad_summary_does_not_abort_datasets() {
        let log = LogRing::new();
        let files = LocalFiles {
            summary: Some(upload("summary.json", "{not json")),
            chats: Some(upload("chats.ndjson", "{\"id\":1}\n{\"id\":2}\n")),
            ..Default::default()
        };
        let payload = loader(&log).load_files(&files).await.unwrap();
        assert!(payload.summary.is_none());
        assert_eq!(payload.chats, vec![json!({"id": 1}), json!({"id": 2})]);
        assert!(payload.contacts.is_empty());
        assert_eq!(log.count_level(LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn non_utf8_upload_is_logged_and_skipped() {
        let log = LogRing::new();
        let files = LocalFiles {
            messages: Some(FileInput::Upload {
                name: "messages.ndjson".into(),
                data: Bytes::from_static(&[0xff, 0xfe, 0x00]),
            }),
            contacts: Some(upload("contacts.ndjson", "{\"n\":1}")),
            ..Default::default()
        };
        let payload = loader(&log).load_files(&files).await.unwrap();
        assert!(payload.messages.is_empty());
        assert_eq!(payload.contacts.len(), 1);
        assert_eq!(log.count_level(LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn path_inputs_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("load_summary.json");
        std::fs::write(&summary, "{\"type\":\"load\",\"dry_run\":false}").unwrap();

        let log = LogRing::new();
        let files = LocalFiles {
            summary: Some(FileInput::Path(summary)),
            ..Default::default()
        };
        let payload = loader(&log).load_files(&files).await.unwrap();
        assert_eq!(payload.summary, Some(json!({"type": "load", "dry_run": false})));
    }

    #[tokio::test]
    async fn byte_order_marks_are_dropped_from_uploads() {
        let log = LogRing::new();
        let files = LocalFiles {
            summary: Some(upload("summary.json", "\u{FEFF}{\"type\":\"extract\"}")),
            contacts: Some(upload("contacts.ndjson", "\u{FEFF}{\"id\":1}\n{\"id\":2}\n")),
            ..Default::default()
        };
        let payload = loader(&log).load_files(&files).await.unwrap();
        assert_eq!(payload.summary, Some(json!({"type": "extract"})));
        assert_eq!(payload.contacts, vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(log.count_level(LogLevel::Error), 0);
    }

    #[tokio::test]
    async fn null_summary_upload_counts_as_absent() {
        let log = LogRing::new();
        let files = LocalFiles {
            summary: Some(upload("summary.json", " null \n")),
            ..Default::default()
        };
        let payload = loader(&log).load_files(&files).await.unwrap();
        assert!(payload.summary.is_none());
        assert!(payload.is_empty());
        assert_eq!(log.count_level(LogLevel::Warn), 1);
    }

    #[tokio::test]
    async fn null_summary_falls_through_to_load_summary() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run-3");
        std::fs::create_dir(&run).unwrap();
        std::fs::write(run.join("summary.json"), "null").unwrap();
        std::fs::write(run.join("load_summary.json"), "{\"type\":\"load\"}").unwrap();
        std::fs::write(run.join("chats.ndjson"), "\u{FEFF}{\"id\":9}\n").unwrap();

        let log = LogRing::new();
        let loader = ResourceLoader::new(
            DataRoot::Dir(dir.path().to_path_buf()),
            Client::new(),
            log.clone(),
        );
        let payload = loader.load_prefix("run-3").await.unwrap();
        assert_eq!(payload.summary, Some(json!({"type": "load"})));
        assert_eq!(payload.chats, vec![json!({"id": 9})]);
        assert_eq!(log.count_level(LogLevel::Error), 0);
    }

    #[test]
    fn selected_counts_every_slot() {
        let mut files = LocalFiles::default();
        assert!(files.is_empty());
        files.set_dataset(DatasetKey::Messages, upload("m", ""));
        files.summary = Some(upload("s", "{}"));
        assert_eq!(files.selected(), 2);
    }
}
