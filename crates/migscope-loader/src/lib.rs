//! migscope loader - fetches pipeline output and feeds it into the store.
//!
//! Resolves a prefix to a remote or local resource root, walks the
//! primary/fallback chain for every resource, reads user-selected files,
//! calls the self-test endpoint, and applies each result to the shared
//! state store as one atomic update.

pub mod error;
pub mod loader;
pub mod session;
pub mod source;

pub use error::*;
pub use loader::{FileInput, LocalFiles, ResourceLoader};
pub use self_test::SelfTestClient;
pub use session::{Notice, NoticeTone, Session};
pub use source::{DataRoot, DirSource, HttpSource, ResourceSource};
