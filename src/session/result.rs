//! Recognition Results
//!
//! Each result owns a fresh property store; the payload keys are written
//! once by the session machinery and are immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;

use crate::properties::{PropertyError, PropertyId, PropertyKey, PropertyStore};

/// Why a session was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The service or transport reported an error.
    Error,
    /// The audio stream ended before a final result was produced.
    EndOfStream,
}

impl CancellationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CancellationReason::Error => "Error",
            CancellationReason::EndOfStream => "EndOfStream",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "Error" => Some(CancellationReason::Error),
            "EndOfStream" => Some(CancellationReason::EndOfStream),
            _ => None,
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation details read back from a result store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationInfo {
    pub reason: CancellationReason,
    pub text: String,
    pub detailed_text: String,
}

/// A recognition outcome with its own immutable property bag.
pub struct RecognitionResult {
    properties: PropertyStore,
}

impl RecognitionResult {
    /// Empty store with every system-owned key read-only, ready for the
    /// session machinery to latch payloads into.
    pub(crate) fn fresh_store() -> Result<PropertyStore, PropertyError> {
        let read_only = PropertyId::system_owned().map(PropertyKey::Id).collect();
        PropertyStore::with_defaults(BTreeMap::new(), read_only)
    }

    pub(crate) fn new(properties: PropertyStore) -> Self {
        Self { properties }
    }

    /// The property bag backing this result.
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Id of the session that produced this result.
    pub fn session_id(&self) -> Option<String> {
        self.properties.get(PropertyId::SessionId)
    }

    /// The service response payload, JSON as text.
    pub fn json_payload(&self) -> Option<String> {
        self.properties.get(PropertyId::JsonResult)
    }

    /// The language-understanding payload, if the session produced one.
    pub fn intent_payload(&self) -> Option<String> {
        self.properties.get(PropertyId::IntentJsonResult)
    }

    /// Service error details, JSON as text.
    pub fn error_details(&self) -> Option<String> {
        self.properties.get(PropertyId::JsonErrorDetails)
    }

    pub fn is_cancelled(&self) -> bool {
        self.properties.has(PropertyId::CancellationReason)
    }

    /// Cancellation details, when this result represents a cancellation.
    pub fn cancellation(&self) -> Option<CancellationInfo> {
        let reason = self
            .properties
            .get(PropertyId::CancellationReason)
            .and_then(|v| CancellationReason::from_str(&v))?;
        Some(CancellationInfo {
            reason,
            text: self
                .properties
                .get_or(PropertyId::CancellationReasonText, ""),
            detailed_text: self
                .properties
                .get_or(PropertyId::CancellationReasonDetailedText, ""),
        })
    }
}
