//! Config entries
//!
//! Registered remote instances are tracked as config entries. The host
//! platform owns durable persistence; this crate keeps the in-memory view
//! the configuration flows claim unique identifiers against and write their
//! finalized options to.

pub mod entry;
pub mod manager;

pub use entry::{ConfigEntry, ConfigEntrySource, ConfigEntryUpdate};
pub use manager::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult};
