//! Resource roots a prefix can resolve to.
//!
//! A source answers "give me the text of this resource" with three distinct
//! outcomes: the text, `None` when the resource does not exist, or an error
//! when it could not be reached. The loader treats the last two alike but
//! logs them differently.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::LoadError;

#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Fetch the full text of `name`. `Ok(None)` means the resource does not exist.
    async fn fetch_text(&self, name: &str) -> Result<Option<String>, LoadError>;

    /// Where `name` would be read from, for log lines.
    fn locate(&self, name: &str) -> String;
}

/// Resources served over HTTP below a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    /// `base` is treated as a directory; a trailing slash is added if missing.
    pub fn new(client: Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    fn url_for(&self, name: &str) -> Result<Url, LoadError> {
        self.base.join(name).map_err(|e| LoadError::InvalidBaseUrl {
            url: self.base.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ResourceSource for HttpSource {
    async fn fetch_text(&self, name: &str) -> Result<Option<String>, LoadError> {
        let url = self.url_for(name)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        decode_text(bytes.to_vec(), url.as_str()).map(Some)
    }

    fn locate(&self, name: &str) -> String {
        self.url_for(name)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base, name))
    }
}

/// Resources read from a local directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ResourceSource for DirSource {
    async fn fetch_text(&self, name: &str) -> Result<Option<String>, LoadError> {
        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_text(bytes, &path.display().to_string()).map(Some)
    }

    fn locate(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }
}

/// Strict UTF-8 decoding shared by every reader. A leading byte-order
/// mark is dropped so the first record parses.
pub(crate) fn decode_text(bytes: Vec<u8>, name: &str) -> Result<String, LoadError> {
    let mut text = String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8 {
        name: name.to_string(),
    })?;
    if text.starts_with('\u{FEFF}') {
        text.drain(..'\u{FEFF}'.len_utf8());
    }
    Ok(text)
}

/// Where prefixes are resolved: an HTTP base or a local data directory.
#[derive(Debug, Clone)]
pub enum DataRoot {
    Http(Url),
    Dir(PathBuf),
}

impl DataRoot {
    /// Parse an HTTP base URL for the remote root.
    pub fn http(url: &str) -> Result<Self, LoadError> {
        Url::parse(url)
            .map(DataRoot::Http)
            .map_err(|e| LoadError::InvalidBaseUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Resolve `prefix` to a concrete source.
    ///
    /// An absolute `http(s)://` prefix is used as the base as-is. Otherwise
    /// the prefix is split on `/` and appended below the root; `.` and `..`
    /// segments are rejected.
    pub fn resolve(
        &self,
        prefix: &str,
        client: &Client,
    ) -> Result<Box<dyn ResourceSource>, LoadError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(LoadError::EmptyPrefix);
        }

        if prefix.starts_with("http://") || prefix.starts_with("https://") {
            let base = Url::parse(prefix).map_err(|_| LoadError::InvalidPrefix(prefix.to_string()))?;
            return Ok(Box::new(HttpSource::new(client.clone(), base)));
        }

        let segments = prefix_segments(prefix)?;
        match self {
            DataRoot::Http(root) => {
                let mut base = root.clone();
                base.path_segments_mut()
                    .map_err(|_| LoadError::InvalidBaseUrl {
                        url: root.to_string(),
                        reason: "URL cannot be a base".to_string(),
                    })?
                    .pop_if_empty()
                    .extend(&segments)
                    .push("");
                Ok(Box::new(HttpSource::new(client.clone(), base)))
            }
            DataRoot::Dir(root) => {
                let dir = segments.iter().fold(root.clone(), |acc, seg| acc.join(seg));
                Ok(Box::new(DirSource::new(dir)))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataRoot::Http(url) => url.to_string(),
            DataRoot::Dir(dir) => dir.display().to_string(),
        }
    }
}

fn prefix_segments(prefix: &str) -> Result<Vec<&str>, LoadError> {
    let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
    let invalid = segments.is_empty()
        || segments
            .iter()
            .any(|s| *s == "." || *s == ".." || s.contains('\\'));
    if invalid {
        return Err(LoadError::InvalidPrefix(prefix.to_string()));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_root_appends_prefix_segments() {
        let root = DataRoot::http("http://data.example/exports").unwrap();
        let source = root.resolve(" 2025/run-01 ", &Client::new()).unwrap();
        assert_eq!(
            source.locate("summary.json"),
            "http://data.example/exports/2025/run-01/summary.json"
        );
    }

    #[test]
    fn absolute_url_prefix_is_used_directly() {
        let root = DataRoot::Dir(PathBuf::from("/srv/data"));
        let source = root
            .resolve("https://cdn.example/run", &Client::new())
            .unwrap();
        assert_eq!(source.locate("chats.ndjson"), "https://cdn.example/run/chats.ndjson");
    }

    #[test]
    fn dir_root_joins_prefix() {
        let root = DataRoot::Dir(PathBuf::from("/srv/data"));
        let source = root.resolve("botmaker/2025", &Client::new()).unwrap();
        assert_eq!(
            PathBuf::from(source.locate("contacts.ndjson")),
            PathBuf::from("/srv/data/botmaker/2025/contacts.ndjson")
        );
    }

    #[test]
    fn traversal_and_blank_prefixes_are_rejected() {
        let root = DataRoot::Dir(PathBuf::from("/srv/data"));
        let client = Client::new();
        assert!(matches!(root.resolve("   ", &client), Err(LoadError::EmptyPrefix)));
        assert!(matches!(root.resolve("../etc", &client), Err(LoadError::InvalidPrefix(_))));
        assert!(matches!(root.resolve("a/./b", &client), Err(LoadError::InvalidPrefix(_))));
        assert!(matches!(root.resolve("///", &client), Err(LoadError::InvalidPrefix(_))));
    }

    #[test]
    fn invalid_http_root_is_reported() {
        assert!(matches!(
            DataRoot::http("not a url"),
            Err(LoadError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn dir_source_distinguishes_missing_from_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chats.ndjson"), "{\"id\":1}\n").unwrap();
        let source = DirSource::new(dir.path());
        assert_eq!(
            source.fetch_text("chats.ndjson").await.unwrap().as_deref(),
            Some("{\"id\":1}\n")
        );
        assert!(source.fetch_text("messages.ndjson").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dir_source_drops_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("summary.json"), "\u{FEFF}{\"type\":\"load\"}").unwrap();
        let source = DirSource::new(dir.path());
        assert_eq!(
            source.fetch_text("summary.json").await.unwrap().as_deref(),
            Some("{\"type\":\"load\"}")
        );
    }

    #[tokio::test]
    async fn dir_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chats.ndjson"), [0xc3, 0x28, b'\n']).unwrap();
        let err = DirSource::new(dir.path())
            .fetch_text("chats.ndjson")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NotUtf8 { .. }));
    }

    #[test]
    fn decode_text_keeps_inner_byte_order_marks() {
        let text = decode_text("\u{FEFF}a\u{FEFF}".as_bytes().to_vec(), "x").unwrap();
        assert_eq!(text, "a\u{FEFF}");
    }
}
