//! Session Binding
//!
//! Binds a configuration store to a recognition session: derives an
//! independent property store, names the session with a fresh UUID, and
//! publishes outcomes through the privileged writer.

use std::fmt;

use uuid::Uuid;

use crate::properties::{PropertyError, PropertyId, PropertyStore};

use super::result::{CancellationReason, RecognitionResult};

/// Recognition mode a session runs in. The session machinery writes the
/// corresponding property itself; callers never set it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    Interactive,
    Conversation,
    Dictation,
}

impl RecognitionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RecognitionMode::Interactive => "INTERACTIVE",
            RecognitionMode::Conversation => "CONVERSATION",
            RecognitionMode::Dictation => "DICTATION",
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One binding of an audio stream to a recognition instance.
///
/// The session owns a store derived from the configuration at bind time;
/// later configuration changes do not reach a bound session.
pub struct Session {
    id: String,
    properties: PropertyStore,
}

impl Session {
    /// Derive a session store from `config` and latch the session id and
    /// recognition mode.
    pub fn bind(config: &PropertyStore, mode: RecognitionMode) -> Result<Self, PropertyError> {
        let properties = config.derive_for_session();
        let id = Uuid::new_v4().to_string();
        properties.system_set(PropertyId::SessionId, id.as_str())?;
        properties.system_set(PropertyId::RecognitionMode, mode.as_str())?;
        tracing::info!(session_id = %id, mode = %mode, "session bound");
        Ok(Self { id, properties })
    }

    /// The session id, a v4 UUID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's own property store.
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Publish a successful recognition payload as a result object.
    pub fn complete(&self, json: &str) -> Result<RecognitionResult, PropertyError> {
        let store = RecognitionResult::fresh_store()?;
        store.system_set(PropertyId::SessionId, self.id.as_str())?;
        store.system_set(PropertyId::JsonResult, json)?;
        tracing::debug!(session_id = %self.id, "recognition result published");
        Ok(RecognitionResult::new(store))
    }

    /// Publish a recognition payload together with its language
    /// understanding response.
    pub fn complete_with_intent(
        &self,
        json: &str,
        intent_json: &str,
    ) -> Result<RecognitionResult, PropertyError> {
        let store = RecognitionResult::fresh_store()?;
        store.system_set(PropertyId::SessionId, self.id.as_str())?;
        store.system_set(PropertyId::JsonResult, json)?;
        store.system_set(PropertyId::IntentJsonResult, intent_json)?;
        tracing::debug!(session_id = %self.id, "intent result published");
        Ok(RecognitionResult::new(store))
    }

    /// Publish a cancellation as a result object carrying the reason, the
    /// texts, and JSON error details.
    pub fn cancel(
        &self,
        reason: CancellationReason,
        text: &str,
        detailed_text: &str,
    ) -> Result<RecognitionResult, PropertyError> {
        let store = RecognitionResult::fresh_store()?;
        store.system_set(PropertyId::SessionId, self.id.as_str())?;
        store.system_set(PropertyId::CancellationReason, reason.as_str())?;
        store.system_set(PropertyId::CancellationReasonText, text)?;
        store.system_set(PropertyId::CancellationReasonDetailedText, detailed_text)?;
        let details = serde_json::json!({
            "reason": reason.as_str(),
            "message": text,
        });
        store.system_set(PropertyId::JsonErrorDetails, details.to_string())?;
        tracing::warn!(session_id = %self.id, %reason, "session cancelled");
        Ok(RecognitionResult::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_latches_session_id_and_mode() {
        let config = PropertyStore::new();
        config.set(PropertyId::RecognitionLanguage, "en-US").unwrap();

        let session = Session::bind(&config, RecognitionMode::Interactive).unwrap();
        let props = session.properties();

        assert_eq!(props.get(PropertyId::SessionId).as_deref(), Some(session.id()));
        assert_eq!(
            props.get(PropertyId::RecognitionMode).as_deref(),
            Some("INTERACTIVE")
        );
        // Seeded from the configuration at bind time.
        assert_eq!(
            props.get(PropertyId::RecognitionLanguage).as_deref(),
            Some("en-US")
        );

        // Latched: nothing may rebind the session id, public or privileged.
        assert!(props.set(PropertyId::SessionId, "other").is_err());
        assert!(props.system_set(PropertyId::SessionId, "other").is_err());
    }

    #[test]
    fn sessions_get_distinct_ids_and_stores() {
        let config = PropertyStore::new();
        let a = Session::bind(&config, RecognitionMode::Dictation).unwrap();
        let b = Session::bind(&config, RecognitionMode::Dictation).unwrap();
        assert_ne!(a.id(), b.id());

        a.properties().set(PropertyId::ProxyHost, "proxy.a").unwrap();
        assert!(!b.properties().has(PropertyId::ProxyHost));
        assert!(!config.has(PropertyId::ProxyHost));
    }

    #[test]
    fn config_changes_after_bind_do_not_reach_the_session() {
        let config = PropertyStore::new();
        config.set(PropertyId::ConnectionRegion, "westeurope").unwrap();
        let session = Session::bind(&config, RecognitionMode::Conversation).unwrap();

        config.set(PropertyId::ConnectionRegion, "eastus").unwrap();
        assert_eq!(
            session.properties().get(PropertyId::ConnectionRegion).as_deref(),
            Some("westeurope")
        );
    }

    #[test]
    fn complete_builds_an_immutable_result() {
        let session = Session::bind(&PropertyStore::new(), RecognitionMode::Interactive).unwrap();
        let result = session.complete("{\"text\":\"hello\"}").unwrap();

        assert_eq!(result.session_id().as_deref(), Some(session.id()));
        assert_eq!(result.json_payload().as_deref(), Some("{\"text\":\"hello\"}"));
        assert!(result
            .properties()
            .set(PropertyId::JsonResult, "{}")
            .is_err());
    }

    #[test]
    fn cancel_carries_reason_and_details() {
        let session = Session::bind(&PropertyStore::new(), RecognitionMode::Interactive).unwrap();
        let result = session
            .cancel(CancellationReason::Error, "connection reset", "ws close 1006")
            .unwrap();

        assert!(result.is_cancelled());
        let info = result.cancellation().unwrap();
        assert_eq!(info.reason, CancellationReason::Error);
        assert_eq!(info.text, "connection reset");
        assert_eq!(info.detailed_text, "ws close 1006");

        let details: serde_json::Value =
            serde_json::from_str(&result.error_details().unwrap()).unwrap();
        assert_eq!(details["reason"], "Error");
    }

    #[test]
    fn intent_results_carry_both_payloads() {
        let session = Session::bind(&PropertyStore::new(), RecognitionMode::Interactive).unwrap();
        let result = session
            .complete_with_intent("{\"text\":\"lights on\"}", "{\"intent\":\"TurnOn\"}")
            .unwrap();
        assert_eq!(result.intent_payload().as_deref(), Some("{\"intent\":\"TurnOn\"}"));
        assert_eq!(result.json_payload().as_deref(), Some("{\"text\":\"lights on\"}"));
    }
}
