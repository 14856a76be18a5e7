//! Typed property store for realtime ASR client sessions.
//!
//! Every configuration, session, and result object in the client embeds a
//! [`PropertyStore`]: a thread-safe bag of string-valued properties under a
//! closed, stable id set, with layered defaults, per-key validation,
//! read-only enforcement for system-owned values, and change notification
//! for live reconfiguration of an in-flight transport.
//!
//! Binding a configuration to a [`Session`] copies its values into an
//! independent store; results carry their own immutable bags.

pub mod data;
pub mod properties;
pub mod session;

pub use data::DefaultsProfile;
pub use properties::{
    PropertyError, PropertyId, PropertyKey, PropertySnapshot, PropertyStore, UnknownKeyPolicy,
    ALL_IDS,
};
pub use session::{CancellationInfo, CancellationReason, RecognitionMode, RecognitionResult, Session};
