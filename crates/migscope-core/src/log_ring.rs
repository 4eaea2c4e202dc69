//! Bounded operator log shown in the dashboard and console log panels.
//!
//! Entries are appended in order and the oldest is evicted once the ring is
//! full. Each entry is mirrored to `tracing` so the process log carries the
//! same events the operator sees.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::LOG_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<String>,
}

impl LogEntry {
    /// `HH:MM:SS [level] message | details`
    pub fn render_line(&self) -> String {
        let mut line = format!(
            "{} [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.level,
            self.message
        );
        if let Some(details) = &self.details {
            line.push_str(" | ");
            line.push_str(details);
        }
        line
    }
}

/// Shared handle to the log ring. Clones append to the same buffer.
#[derive(Debug, Clone)]
pub struct LogRing {
    inner: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogRing {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    /// A capacity of zero is bumped to one so the latest entry is always visible.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, level: LogLevel, message: impl Into<String>, details: Option<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(details = ?details, "{message}"),
            LogLevel::Warn => tracing::warn!(details = ?details, "{message}"),
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(level = %level, details = ?details, "{message}")
            }
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            details,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warn, message, None);
    }

    pub fn error(&self, message: impl Into<String>, details: impl Into<String>) {
        self.record(LogLevel::Error, message, Some(details.into()));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(LogLevel::Success, message, None);
    }

    /// Copy of the current entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// All entries as text, most recent last.
    pub fn render(&self) -> String {
        self.lock()
            .iter()
            .map(LogEntry::render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count_level(&self, level: LogLevel) -> usize {
        self.lock().iter().filter(|e| e.level == level).count()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock cannot leave the deque half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new()
    }
}
