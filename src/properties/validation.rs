//! Per-Key Value Validation
//!
//! Format checks applied at `set` time for the well-known ids whose values
//! have known syntax. Keys without an entry here accept any string.

use super::error::PropertyError;
use super::id::PropertyId;

/// Check `value` against the format expected for `id`.
///
/// All-or-nothing: callers only mutate the store when this returns `Ok`.
pub fn check(id: PropertyId, value: &str) -> Result<(), PropertyError> {
    let expected = match id {
        PropertyId::ConnectionEndpoint => {
            if is_endpoint_url(value) {
                return Ok(());
            }
            "a ws://, wss://, http:// or https:// URL"
        }
        PropertyId::ConnectionRegion | PropertyId::IntentRegion => {
            if is_token(value) {
                return Ok(());
            }
            "a non-empty region identifier without whitespace"
        }
        PropertyId::ProxyHost => {
            if is_token(value) {
                return Ok(());
            }
            "a non-empty host name without whitespace"
        }
        PropertyId::ProxyPort => {
            if value.parse::<u16>().map(|p| p > 0).unwrap_or(false) {
                return Ok(());
            }
            "an integer between 1 and 65535"
        }
        PropertyId::TranslationTargetLanguages => {
            if !value.is_empty() && value.split(',').all(is_language_tag) {
                return Ok(());
            }
            "a comma separated list of BCP-47 language tags"
        }
        PropertyId::RecognitionLanguage => {
            if is_language_tag(value) {
                return Ok(());
            }
            "a BCP-47 language tag"
        }
        PropertyId::RecognitionMode => {
            if matches!(value, "INTERACTIVE" | "CONVERSATION" | "DICTATION") {
                return Ok(());
            }
            "one of INTERACTIVE, CONVERSATION, DICTATION"
        }
        PropertyId::RequestDetailedResult | PropertyId::RequestProfanityFilter => {
            if matches!(value, "true" | "false") {
                return Ok(());
            }
            "\"true\" or \"false\""
        }
        // Free-form: keys, tokens, ids, voices, JSON payloads.
        _ => return Ok(()),
    };

    Err(PropertyError::InvalidValue {
        key: id.name().to_string(),
        value: value.to_string(),
        expected,
    })
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

fn is_endpoint_url(value: &str) -> bool {
    ["ws://", "wss://", "http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme) && value.len() > scheme.len())
}

/// Lightweight BCP-47 shape check: a 2-8 letter primary subtag followed by
/// alphanumeric subtags separated by '-'.
fn is_language_tag(value: &str) -> bool {
    let mut subtags = value.split('-');
    let primary = match subtags.next() {
        Some(s) => s,
        None => return false,
    };
    if primary.len() < 2 || primary.len() > 8 || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    subtags.all(|s| {
        !s.is_empty() && s.len() <= 8 && s.chars().all(|c| c.is_ascii_alphanumeric())
    })
}
