use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown dataset '{0}' (expected contacts, chats or messages)")]
    UnknownDataset(String),
}
