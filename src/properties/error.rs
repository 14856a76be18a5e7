//! Property Store Errors
//!
//! All errors here are synchronous and non-fatal: a rejected write leaves
//! the store unchanged and the owning session keeps running.

use thiserror::Error;

/// Errors surfaced by property store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// Write attempt on a system-owned key through the public API, or a
    /// second privileged write after the value was latched.
    #[error("property '{key}' is read-only")]
    ReadOnly { key: String },

    /// Name outside the closed id set, rejected under the strict policy.
    #[error("unknown property '{name}'")]
    Unknown { name: String },

    /// Value failed the key's format check; the store was left unchanged.
    #[error("invalid value '{value}' for property '{key}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A change callback tried to mutate the store it was notified by.
    /// Deferred updates must go through a separate scheduling context.
    #[error("store mutation from inside a change callback")]
    ReentrantMutation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_key() {
        let err = PropertyError::ReadOnly {
            key: "session.id".to_string(),
        };
        assert!(format!("{}", err).contains("session.id"));

        let err = PropertyError::InvalidValue {
            key: "proxy.port".to_string(),
            value: "eighty".to_string(),
            expected: "an integer between 1 and 65535",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("proxy.port"));
        assert!(msg.contains("eighty"));
        assert!(msg.contains("65535"));
    }
}
