//! migscope core - record model and pure logic for the migration inspector.
//!
//! Holds everything that does not touch the network or the filesystem:
//! the bounded operator log, the tolerant NDJSON parser, the application
//! state store, and the view derivations the dashboard and console render.

pub mod constants;
pub mod error;
pub mod log_ring;
pub mod ndjson;
pub mod store;
pub mod types;
pub mod views;

pub use constants::*;
pub use error::*;
pub use log_ring::{LogEntry, LogLevel, LogRing};
pub use ndjson::{parse_ndjson, parse_ndjson_report, ParseReport};
pub use store::{LoadTicket, StateStore};
pub use types::*;
