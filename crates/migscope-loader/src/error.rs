use std::fmt;

use thiserror::Error;

/// Errors raised while resolving or fetching resources.
///
/// `EmptyPrefix`, `InvalidPrefix` and `NoFilesSelected` are user-input
/// errors and are raised before any I/O.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("enter a prefix before loading")]
    EmptyPrefix,

    #[error("invalid prefix '{0}'")]
    InvalidPrefix(String),

    #[error("select at least one file before loading")]
    NoFilesSelected,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} is not valid UTF-8")]
    NotUtf8 { name: String },
}

impl LoadError {
    /// True for errors caused by what the user entered or selected.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LoadError::EmptyPrefix | LoadError::InvalidPrefix(_) | LoadError::NoFilesSelected
        )
    }
}

/// Failure of the remote self-test call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestError {
    pub message: String,
    pub hint: Option<String>,
    pub status: Option<u16>,
}

impl SelfTestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }
}

impl fmt::Display for SelfTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for SelfTestError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_classified() {
        assert!(LoadError::EmptyPrefix.is_user_error());
        assert!(LoadError::NoFilesSelected.is_user_error());
        assert!(LoadError::InvalidPrefix("..".into()).is_user_error());
        assert!(!LoadError::NotUtf8 { name: "x".into() }.is_user_error());
    }

    #[test]
    fn self_test_error_display_includes_hint() {
        let err = SelfTestError::new("auth failed")
            .with_status(500)
            .with_hint(Some("rotate token".into()));
        assert_eq!(err.to_string(), "auth failed (hint: rotate token)");
        assert_eq!(SelfTestError::new("boom").to_string(), "boom");
    }
}
