use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EXPORT_STATUS_SUFFIX, RAW_SUFFIX};
use crate::CoreError;

/// A schema-less record. Keys vary between records of the same dataset.
pub type Record = Value;

/// One of the three datasets the migration pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKey {
    #[default]
    Contacts,
    Chats,
    Messages,
}

impl DatasetKey {
    /// All keys in declared order.
    pub const ALL: [DatasetKey; 3] = [DatasetKey::Contacts, DatasetKey::Chats, DatasetKey::Messages];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKey::Contacts => "contacts",
            DatasetKey::Chats => "chats",
            DatasetKey::Messages => "messages",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DatasetKey::Contacts => "Contacts",
            DatasetKey::Chats => "Chats",
            DatasetKey::Messages => "Messages",
        }
    }

    /// Resource name of the export-status variant, e.g. `chats_export_status.ndjson`.
    pub fn export_status_resource(&self) -> String {
        format!("{}{}", self.as_str(), EXPORT_STATUS_SUFFIX)
    }

    /// Resource name of the raw variant, e.g. `chats.ndjson`.
    pub fn raw_resource(&self) -> String {
        format!("{}{}", self.as_str(), RAW_SUFFIX)
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contacts" => Ok(DatasetKey::Contacts),
            "chats" => Ok(DatasetKey::Chats),
            "messages" => Ok(DatasetKey::Messages),
            _ => Err(CoreError::UnknownDataset(s.to_string())),
        }
    }
}

/// Everything a single load produces. Handed to the store as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadPayload {
    pub summary: Option<Record>,
    pub contacts: Vec<Record>,
    pub chats: Vec<Record>,
    pub messages: Vec<Record>,
}

impl LoadPayload {
    /// Normalize a self-test response body.
    ///
    /// A null or missing `summary` is absent; a missing or non-array dataset
    /// field is empty. Nothing else in the body is inspected.
    pub fn from_response(body: Value) -> Self {
        let mut body = match body {
            Value::Object(map) => map,
            _ => return Self::default(),
        };

        let summary = match body.remove("summary") {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        };
        let mut take = |key: DatasetKey| match body.remove(key.as_str()) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        Self {
            summary,
            contacts: take(DatasetKey::Contacts),
            chats: take(DatasetKey::Chats),
            messages: take(DatasetKey::Messages),
        }
    }

    pub fn records(&self, key: DatasetKey) -> &[Record] {
        match key {
            DatasetKey::Contacts => &self.contacts,
            DatasetKey::Chats => &self.chats,
            DatasetKey::Messages => &self.messages,
        }
    }

    pub fn records_mut(&mut self, key: DatasetKey) -> &mut Vec<Record> {
        match key {
            DatasetKey::Contacts => &mut self.contacts,
            DatasetKey::Chats => &mut self.chats,
            DatasetKey::Messages => &mut self.messages,
        }
    }

    pub fn count(&self, key: DatasetKey) -> usize {
        self.records(key).len()
    }

    /// True when there is neither a summary nor any record.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && DatasetKey::ALL.iter().all(|k| self.count(*k) == 0)
    }

    /// `contacts=N chats=N messages=N`, used in log lines.
    pub fn count_line(&self) -> String {
        DatasetKey::ALL
            .iter()
            .map(|k| format!("{}={}", k.as_str(), self.count(*k)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dataset_key_parses_known_names_only() {
        assert_eq!("contacts".parse::<DatasetKey>().unwrap(), DatasetKey::Contacts);
        assert_eq!(" Chats ".parse::<DatasetKey>().unwrap(), DatasetKey::Chats);
        assert_eq!("MESSAGES".parse::<DatasetKey>().unwrap(), DatasetKey::Messages);
        assert!("summary".parse::<DatasetKey>().is_err());
        assert!("".parse::<DatasetKey>().is_err());
    }

    #[test]
    fn resource_names_follow_pipeline_layout() {
        assert_eq!(DatasetKey::Chats.export_status_resource(), "chats_export_status.ndjson");
        assert_eq!(DatasetKey::Messages.raw_resource(), "messages.ndjson");
    }

    #[test]
    fn from_response_normalizes_missing_and_malformed_fields() {
        let payload = LoadPayload::from_response(json!({
            "summary": null,
            "contacts": [{"id": 1}],
            "chats": "not-a-list",
        }));
        assert!(payload.summary.is_none());
        assert_eq!(payload.count(DatasetKey::Contacts), 1);
        assert_eq!(payload.count(DatasetKey::Chats), 0);
        assert_eq!(payload.count(DatasetKey::Messages), 0);
    }

    #[test]
    fn from_response_on_non_object_is_empty() {
        assert!(LoadPayload::from_response(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn count_line_lists_every_dataset() {
        let payload = LoadPayload {
            summary: None,
            contacts: vec![json!({}), json!({})],
            chats: vec![],
            messages: vec![json!({})],
        };
        assert_eq!(payload.count_line(), "contacts=2 chats=0 messages=1");
    }
}
