//! Tolerant NDJSON parsing.
//!
//! One JSON value per line. A line that fails to decode is logged with its
//! 1-based line number and skipped; the rest of the input still loads.

use crate::log_ring::LogRing;
use crate::types::Record;

/// Outcome of parsing one NDJSON text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub records: Vec<Record>,
    /// 1-based numbers of lines that failed to decode.
    pub failed_lines: Vec<usize>,
}

impl ParseReport {
    /// Non-blank lines seen: decoded plus failed.
    pub fn lines_seen(&self) -> usize {
        self.records.len() + self.failed_lines.len()
    }
}

/// Parse `text` and return only the decoded values.
pub fn parse_ndjson(text: &str, context: Option<&str>, log: &LogRing) -> Vec<Record> {
    parse_ndjson_report(text, context, log).records
}

pub fn parse_ndjson_report(text: &str, context: Option<&str>, log: &LogRing) -> ParseReport {
    let mut report = ParseReport::default();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(value) => report.records.push(value),
            Err(e) => {
                let line_no = idx + 1;
                let message = match context {
                    Some(ctx) => format!("{ctx}: Invalid JSON on line {line_no}"),
                    None => format!("Invalid JSON on line {line_no}"),
                };
                log.error(message, e.to_string());
                report.failed_lines.push(line_no);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use serde_json::json;

    #[test]
    fn malformed_line_is_isolated() {
        let log = LogRing::new();
        let records = parse_ndjson("{\"a\":1}\nbad-json\n{\"b\":2}", None, &log);
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);

        let errors: Vec<_> = log
            .entries()
            .into_iter()
            .filter(|e| e.level == LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("line 2"));
        assert!(errors[0].details.is_some());
    }

    #[test]
    fn empty_and_blank_input_logs_nothing() {
        let log = LogRing::new();
        assert!(parse_ndjson("", None, &log).is_empty());
        assert!(parse_ndjson("  \n\t\n\r\n", None, &log).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn blank_lines_keep_original_line_numbers() {
        let log = LogRing::new();
        let report = parse_ndjson_report("\n{\"ok\":true}\n\n{oops\n", Some("chats.ndjson"), &log);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failed_lines, vec![4]);
        assert!(log.entries()[0].message.starts_with("chats.ndjson: "));
    }

    #[test]
    fn crlf_and_non_object_values_are_accepted() {
        let log = LogRing::new();
        let records = parse_ndjson("[1,2]\r\n\"text\"\r\n42\r\nnull\r\n", None, &log);
        assert_eq!(records, vec![json!([1, 2]), json!("text"), json!(42), json!(null)]);
        assert!(log.is_empty());
    }

    #[test]
    fn output_plus_errors_equals_non_blank_lines() {
        let inputs = [
            "{}\n{}\n",
            "x\ny\nz",
            "{\"a\":1}\n\n  \n{\"a\":\n{\"b\":[1,2,3]}\n]",
            "",
            "1\n2\n3\n{\n}\n",
        ];
        for input in inputs {
            let log = LogRing::new();
            let report = parse_ndjson_report(input, None, &log);
            let non_blank = input.lines().filter(|l| !l.trim().is_empty()).count();
            assert_eq!(report.records.len() + log.count_level(LogLevel::Error), non_blank);
            assert_eq!(report.lines_seen(), non_blank);
        }
    }
}
