//! Session property storage
//!
//! The typed key/value layer every configuration, session, and result object
//! embeds: a closed id set, layered defaults, per-key validation, read-only
//! enforcement, change notification, and point-in-time snapshots.

mod error;
mod id;
mod store;
mod validation;

pub use error::PropertyError;
pub use id::{PropertyId, PropertyKey, ALL_IDS};
pub use store::{PropertySnapshot, PropertyStore, UnknownKeyPolicy};
