//! Property Identifiers
//!
//! The closed set of well-known property ids a speech session understands,
//! plus the store key type that admits vendor-extension names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known property ids.
///
/// Names and numeric ids form the wire contract with other language bindings
/// and serialized diagnostics: both are stable across versions. New ids may
/// be appended inside their numeric group, existing ids are never renumbered.
///
/// Groups: 1000 connection, 1100 proxy, 2000 translation/intent routing,
/// 3000 recognition/session, 4000 response flags, 5000 response payloads,
/// 6000 cancellation details, 7000 intent payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PropertyId {
    /// The service subscription key. Prefer the configuration constructors
    /// over writing this directly.
    #[serde(rename = "connection.key")]
    ConnectionKey = 1000,

    /// The service endpoint URL. Not the endpoint used to obtain an access
    /// token.
    #[serde(rename = "connection.endpoint")]
    ConnectionEndpoint = 1001,

    /// The service region.
    #[serde(rename = "connection.region")]
    ConnectionRegion = 1002,

    /// The authorization (access) token.
    #[serde(rename = "auth.token")]
    AuthToken = 1003,

    /// The authorization type. Currently unused.
    #[serde(rename = "auth.type")]
    AuthType = 1004,

    /// The custom-model endpoint id.
    #[serde(rename = "connection.endpoint_id")]
    ConnectionEndpointId = 1005,

    /// Host name of the proxy used to reach the service.
    #[serde(rename = "proxy.host")]
    ProxyHost = 1100,

    /// Port of the proxy used to reach the service.
    #[serde(rename = "proxy.port")]
    ProxyPort = 1101,

    /// User name for proxy authentication.
    #[serde(rename = "proxy.user")]
    ProxyUser = 1102,

    /// Password for proxy authentication.
    #[serde(rename = "proxy.password")]
    ProxyPassword = 1103,

    /// Comma separated list of BCP-47 translation target languages.
    #[serde(rename = "translation.target_languages")]
    TranslationTargetLanguages = 2000,

    /// Name of the synthesis voice used for translated output.
    #[serde(rename = "translation.voice")]
    TranslationVoice = 2001,

    /// Translation feature flags. For internal use.
    #[serde(rename = "translation.features")]
    TranslationFeatures = 2002,

    /// Region of the language-understanding service.
    #[serde(rename = "intent.region")]
    IntentRegion = 2003,

    /// Recognition mode: "INTERACTIVE", "CONVERSATION" or "DICTATION".
    /// System-owned; the session machinery writes it at bind time.
    #[serde(rename = "recognition.mode")]
    RecognitionMode = 3000,

    /// The spoken language to recognize, as a BCP-47 tag.
    #[serde(rename = "recognition.language")]
    RecognitionLanguage = 3001,

    /// The session id, a UUID naming one binding of an audio stream to a
    /// recognition instance. System-owned, latched once per session.
    #[serde(rename = "session.id")]
    SessionId = 3002,

    /// Whether detailed ("true") or simple ("false") results are requested.
    #[serde(rename = "response.request_detailed_result")]
    RequestDetailedResult = 4000,

    /// Whether profanity filtering is requested. Currently unused.
    #[serde(rename = "response.request_profanity_filter")]
    RequestProfanityFilter = 4001,

    /// The service response payload in JSON. Present on result stores only.
    #[serde(rename = "response.json_result")]
    JsonResult = 5000,

    /// Service error details in JSON. Present on result stores only.
    #[serde(rename = "response.json_error_details")]
    JsonErrorDetails = 5001,

    /// The cancellation reason.
    #[serde(rename = "cancellation.reason")]
    CancellationReason = 6000,

    /// The cancellation text.
    #[serde(rename = "cancellation.reason_text")]
    CancellationReasonText = 6001,

    /// The detailed cancellation text.
    #[serde(rename = "cancellation.reason_detailed_text")]
    CancellationReasonDetailedText = 6002,

    /// The language-understanding response payload in JSON. Present on
    /// result stores only.
    #[serde(rename = "intent.json_result")]
    IntentJsonResult = 7000,
}

/// Every known id, in ordinal order.
pub const ALL_IDS: [PropertyId; 25] = [
    PropertyId::ConnectionKey,
    PropertyId::ConnectionEndpoint,
    PropertyId::ConnectionRegion,
    PropertyId::AuthToken,
    PropertyId::AuthType,
    PropertyId::ConnectionEndpointId,
    PropertyId::ProxyHost,
    PropertyId::ProxyPort,
    PropertyId::ProxyUser,
    PropertyId::ProxyPassword,
    PropertyId::TranslationTargetLanguages,
    PropertyId::TranslationVoice,
    PropertyId::TranslationFeatures,
    PropertyId::IntentRegion,
    PropertyId::RecognitionMode,
    PropertyId::RecognitionLanguage,
    PropertyId::SessionId,
    PropertyId::RequestDetailedResult,
    PropertyId::RequestProfanityFilter,
    PropertyId::JsonResult,
    PropertyId::JsonErrorDetails,
    PropertyId::CancellationReason,
    PropertyId::CancellationReasonText,
    PropertyId::CancellationReasonDetailedText,
    PropertyId::IntentJsonResult,
];

impl PropertyId {
    /// Stable numeric id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Stable canonical name.
    pub fn name(self) -> &'static str {
        match self {
            PropertyId::ConnectionKey => "connection.key",
            PropertyId::ConnectionEndpoint => "connection.endpoint",
            PropertyId::ConnectionRegion => "connection.region",
            PropertyId::AuthToken => "auth.token",
            PropertyId::AuthType => "auth.type",
            PropertyId::ConnectionEndpointId => "connection.endpoint_id",
            PropertyId::ProxyHost => "proxy.host",
            PropertyId::ProxyPort => "proxy.port",
            PropertyId::ProxyUser => "proxy.user",
            PropertyId::ProxyPassword => "proxy.password",
            PropertyId::TranslationTargetLanguages => "translation.target_languages",
            PropertyId::TranslationVoice => "translation.voice",
            PropertyId::TranslationFeatures => "translation.features",
            PropertyId::IntentRegion => "intent.region",
            PropertyId::RecognitionMode => "recognition.mode",
            PropertyId::RecognitionLanguage => "recognition.language",
            PropertyId::SessionId => "session.id",
            PropertyId::RequestDetailedResult => "response.request_detailed_result",
            PropertyId::RequestProfanityFilter => "response.request_profanity_filter",
            PropertyId::JsonResult => "response.json_result",
            PropertyId::JsonErrorDetails => "response.json_error_details",
            PropertyId::CancellationReason => "cancellation.reason",
            PropertyId::CancellationReasonText => "cancellation.reason_text",
            PropertyId::CancellationReasonDetailedText => "cancellation.reason_detailed_text",
            PropertyId::IntentJsonResult => "intent.json_result",
        }
    }

    /// Look up a known id by its numeric value.
    pub fn from_id(id: u32) -> Option<Self> {
        ALL_IDS.iter().copied().find(|p| p.id() == id)
    }

    /// Look up a known id by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_IDS.iter().copied().find(|p| p.name() == name)
    }

    /// Whether only the session machinery may write this id.
    ///
    /// These are the result and session bookkeeping values; public `set`
    /// rejects them on any store that marks them read-only.
    pub fn is_system_owned(self) -> bool {
        matches!(
            self,
            PropertyId::RecognitionMode
                | PropertyId::SessionId
                | PropertyId::JsonResult
                | PropertyId::JsonErrorDetails
                | PropertyId::CancellationReason
                | PropertyId::CancellationReasonText
                | PropertyId::CancellationReasonDetailedText
                | PropertyId::IntentJsonResult
        )
    }

    /// The system-owned subset of [`ALL_IDS`].
    pub fn system_owned() -> impl Iterator<Item = PropertyId> {
        ALL_IDS.iter().copied().filter(|p| p.is_system_owned())
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A store key: a known id, or a vendor-extension name admitted by the
/// permissive unknown-key policy.
///
/// Ordering puts known ids first (by ordinal), then extensions by name; this
/// is the order snapshots iterate in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    Id(PropertyId),
    Custom(String),
}

impl PropertyKey {
    /// Resolve a string name: canonical names map to their known id,
    /// anything else becomes a vendor extension.
    pub fn parse(name: &str) -> Self {
        match PropertyId::from_name(name) {
            Some(id) => PropertyKey::Id(id),
            None => PropertyKey::Custom(name.to_string()),
        }
    }

    /// The key's name as referenced in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            PropertyKey::Id(id) => id.name(),
            PropertyKey::Custom(name) => name,
        }
    }

    /// Numeric id for known keys, `None` for extensions.
    pub fn id(&self) -> Option<u32> {
        match self {
            PropertyKey::Id(id) => Some(id.id()),
            PropertyKey::Custom(_) => None,
        }
    }
}

impl From<PropertyId> for PropertyKey {
    fn from(id: PropertyId) -> Self {
        PropertyKey::Id(id)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for PropertyKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
