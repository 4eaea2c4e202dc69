//! Read-only derivations of the store for the summary, metrics, dataset
//! tabs, samples and adaptive table views.
//!
//! Nothing here mutates state; calling any function twice on the same store
//! yields the same output. Markup escaping belongs to the surface that
//! renders these values, not to this module.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::constants::{EXPORTED_FIELD, MISSING_CELL, SUMMARY_PLACEHOLDER};
use crate::store::StateStore;
use crate::types::{DatasetKey, Record};

/// True when there is nothing to show: no summary and no records anywhere.
pub fn is_hidden(store: &StateStore) -> bool {
    !store.has_data()
}

/// Pretty-printed summary, if one was loaded.
pub fn summary_text(store: &StateStore) -> Option<String> {
    store
        .summary()
        .map(|s| serde_json::to_string_pretty(s).unwrap_or_else(|_| s.to_string()))
}

/// Summary text or the placeholder notice.
pub fn summary_or_placeholder(store: &StateStore) -> String {
    summary_text(store).unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMetric {
    pub key: DatasetKey,
    pub label: &'static str,
    pub total: usize,
    pub exported: usize,
}

/// Records whose `exported_to_chatwoot` is the boolean `true`.
pub fn exported_count(records: &[Record]) -> usize {
    records
        .iter()
        .filter(|r| matches!(r.get(EXPORTED_FIELD), Some(Value::Bool(true))))
        .count()
}

pub fn metrics(store: &StateStore) -> Vec<DatasetMetric> {
    DatasetKey::ALL
        .into_iter()
        .map(|key| {
            let records = store.records(key);
            DatasetMetric {
                key,
                label: key.label(),
                total: records.len(),
                exported: exported_count(records),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetTab {
    pub key: DatasetKey,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
    pub empty: bool,
}

pub fn dataset_tabs(store: &StateStore) -> Vec<DatasetTab> {
    DatasetKey::ALL
        .into_iter()
        .map(|key| {
            let count = store.count(key);
            DatasetTab {
                key,
                label: key.label(),
                count,
                active: key == store.active(),
                empty: count == 0,
            }
        })
        .collect()
}

/// The first few records of one dataset, pretty-printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSample {
    pub key: DatasetKey,
    pub label: &'static str,
    pub total: usize,
    pub records: Vec<String>,
}

impl DatasetSample {
    /// Records left out of the sample.
    pub fn remaining(&self) -> usize {
        self.total - self.records.len()
    }
}

/// Up to `n` leading records of every non-empty dataset, in declared order.
pub fn samples(store: &StateStore, n: usize) -> Vec<DatasetSample> {
    DatasetKey::ALL
        .into_iter()
        .filter(|key| store.count(*key) > 0)
        .map(|key| {
            let records = store.records(key);
            DatasetSample {
                key,
                label: key.label(),
                total: records.len(),
                records: records
                    .iter()
                    .take(n)
                    .map(|r| serde_json::to_string_pretty(r).unwrap_or_else(|_| r.to_string()))
                    .collect(),
            }
        })
        .collect()
}

/// A formatted table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Cell {
    /// Null or key absent from the record.
    Missing,
    /// Object or array as compact JSON.
    Structured(String),
    Bool(bool),
    /// RFC 3339 date-time normalized to UTC ISO-8601.
    Timestamp(String),
    Text(String),
}

impl Cell {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Missing,
            Some(v @ (Value::Object(_) | Value::Array(_))) => Cell::Structured(v.to_string()),
            Some(Value::Bool(b)) => Cell::Bool(*b),
            Some(Value::String(s)) => match parse_timestamp(s) {
                Some(ts) => Cell::Timestamp(ts),
                None => Cell::Text(s.clone()),
            },
            Some(Value::Number(n)) => Cell::Text(n.to_string()),
        }
    }

    /// Plain display text, before any markup escaping.
    pub fn text(&self) -> String {
        match self {
            Cell::Missing => MISSING_CELL.to_string(),
            Cell::Structured(s) | Cell::Timestamp(s) | Cell::Text(s) => s.clone(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(s.trim()).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cells", rename_all = "lowercase")]
pub enum TableRow {
    /// An object record, one cell per column.
    Fields(Vec<Cell>),
    /// A non-object record, shown as one cell across the whole row.
    Value(Cell),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableView {
    /// Sorted union of keys across object records. Empty when no record is an object.
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl TableView {
    /// Columns the header needs: at least one, unlabeled when there are no keys.
    pub fn header_width(&self) -> usize {
        self.columns.len().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sorted union of keys across the object records.
pub fn infer_columns(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn table(records: &[Record]) -> TableView {
    let columns = infer_columns(records);
    let rows = records
        .iter()
        .map(|record| match record.as_object() {
            Some(obj) => TableRow::Fields(
                columns
                    .iter()
                    .map(|col| Cell::from_value(obj.get(col)))
                    .collect(),
            ),
            None => TableRow::Value(Cell::from_value(Some(record))),
        })
        .collect();
    TableView { columns, rows }
}

/// Table of the active dataset.
pub fn active_table(store: &StateStore) -> TableView {
    table(store.active_records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoadPayload;
    use serde_json::json;

    #[test]
    fn exported_count_requires_literal_true() {
        let records = vec![
            json!({ "exported_to_chatwoot": true }),
            json!({ "exported_to_chatwoot": "true" }),
            json!({}),
            json!({ "exported_to_chatwoot": 1 }),
            json!([true]),
        ];
        assert_eq!(exported_count(&records), 1);
    }

    #[test]
    fn columns_are_sorted_union_of_object_keys() {
        let records = vec![
            json!({ "name": "Ana", "id": 1 }),
            json!({ "phone": "+55", "id": 2 }),
            json!(["ignored"]),
            json!("also ignored"),
        ];
        assert_eq!(infer_columns(&records), vec!["id", "name", "phone"]);
    }

    #[test]
    fn rows_fill_missing_columns_with_placeholder() {
        let view = table(&[json!({ "a": 1 }), json!({ "b": null })]);
        assert_eq!(view.columns, vec!["a", "b"]);
        assert_eq!(
            view.rows[0],
            TableRow::Fields(vec![Cell::Text("1".into()), Cell::Missing])
        );
        assert_eq!(view.rows[1], TableRow::Fields(vec![Cell::Missing, Cell::Missing]));
        assert_eq!(Cell::Missing.text(), "\u{2014}");
    }

    #[test]
    fn non_object_records_span_the_row() {
        let view = table(&[json!([1, 2]), json!(7)]);
        assert!(view.columns.is_empty());
        assert_eq!(view.header_width(), 1);
        assert_eq!(view.rows[0], TableRow::Value(Cell::Structured("[1,2]".into())));
        assert_eq!(view.rows[1], TableRow::Value(Cell::Text("7".into())));
    }

    #[test]
    fn cell_formatting_priority() {
        assert_eq!(Cell::from_value(Some(&json!({ "k": [1] }))), Cell::Structured("{\"k\":[1]}".into()));
        assert_eq!(Cell::from_value(Some(&json!(false))).text(), "false");
        assert_eq!(Cell::from_value(Some(&json!(2.5))).text(), "2.5");
        assert_eq!(Cell::from_value(Some(&json!("plain"))), Cell::Text("plain".into()));
        assert_eq!(
            Cell::from_value(Some(&json!("2025-03-01T12:30:00-03:00"))),
            Cell::Timestamp("2025-03-01T15:30:00.000Z".into())
        );
        assert_eq!(Cell::from_value(Some(&json!("2025-03-01"))), Cell::Text("2025-03-01".into()));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let mut store = StateStore::new();
        store.apply(
            LoadPayload {
                contacts: vec![json!({ "z": 1, "a": { "x": true } }), json!({ "m": "t" })],
                ..Default::default()
            },
            "test",
        );
        assert_eq!(active_table(&store), active_table(&store));
        assert_eq!(metrics(&store), metrics(&store));
    }

    #[test]
    fn tabs_mark_active_and_empty() {
        let mut store = StateStore::new();
        store.apply(
            LoadPayload {
                chats: vec![json!({}), json!({}), json!({})],
                ..Default::default()
            },
            "test",
        );
        let tabs = dataset_tabs(&store);
        assert_eq!(tabs.len(), 3);
        assert!(tabs[0].empty && !tabs[0].active);
        assert!(!tabs[1].empty && tabs[1].active);
        assert_eq!(tabs[1].count, 3);
        assert!(tabs[2].empty);
    }

    #[test]
    fn samples_take_leading_records_of_non_empty_datasets() {
        let mut store = StateStore::new();
        assert!(samples(&store, 3).is_empty());
        store.apply(
            LoadPayload {
                contacts: (1..=5).map(|i| json!({ "id": i })).collect(),
                messages: vec![json!("raw line")],
                ..Default::default()
            },
            "test",
        );

        let shown = samples(&store, 2);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].key, DatasetKey::Contacts);
        assert_eq!(shown[0].total, 5);
        assert_eq!(shown[0].records, vec!["{\n  \"id\": 1\n}", "{\n  \"id\": 2\n}"]);
        assert_eq!(shown[0].remaining(), 3);
        assert_eq!(shown[1].key, DatasetKey::Messages);
        assert_eq!(shown[1].records, vec!["\"raw line\""]);
        assert_eq!(shown[1].remaining(), 0);
        assert_eq!(samples(&store, 2), shown);
    }

    #[test]
    fn hidden_only_without_summary_and_records() {
        let mut store = StateStore::new();
        assert!(is_hidden(&store));
        assert_eq!(summary_or_placeholder(&store), SUMMARY_PLACEHOLDER);
        store.apply(
            LoadPayload {
                summary: Some(json!({ "type": "extract" })),
                ..Default::default()
            },
            "test",
        );
        assert!(!is_hidden(&store));
        assert!(summary_text(&store).unwrap().contains("\"type\": \"extract\""));
    }
}
