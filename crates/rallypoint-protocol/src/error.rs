//! Error types for the protocol layer.
//!
//! Each crate in Rallypoint defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the data itself (a value that
//! doesn't parse, a snapshot that can't be serialized), not in a remote
//! call or in the coordinator's state machine.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated input.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A string did not name a known value, e.g. an unknown query
    /// field or an unknown character.
    #[error("unknown {kind}: {value:?}")]
    Unknown {
        /// What was being parsed ("character", "query field", ...).
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}
