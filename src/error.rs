//! Crate-wide error type.
//!
//! Validation failures, transport failures and remote API failures are
//! distinct variants so callers can decide whether to fix their input,
//! retry, or surface the upstream message.

use thiserror::Error;

/// Errors that can occur while building operations or talking to the API.
#[derive(Error, Debug)]
pub enum Error {
    /// The operation kind tag is not one of the supported operations.
    #[error("unknown operation kind: {0}")]
    UnknownOperation(String),

    /// A required field was absent from the operation input.
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// A field was present but had the wrong shape.
    #[error("field `{field}` expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// A field was supplied that the operation does not declare.
    #[error("field `{0}` is not accepted by this operation")]
    UnknownField(String),

    /// Fewer than two raw message entries were supplied to the builder.
    #[error("a conversation needs at least two messages")]
    InsufficientMessages,

    /// A raw message entry was not a JSON object.
    #[error("every message entry must be an object")]
    MalformedMessages,

    /// The prompt exceeds the model's token budget; nothing was sent.
    #[error("token limit for model {model} exceeded: {count} is more than {max}")]
    TokenLimitExceeded {
        model: String,
        count: usize,
        max: usize,
    },

    /// Connection-level failure (DNS, TCP, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A body could not be parsed as the expected JSON shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A structured remote failure with the upstream message verbatim.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The embeddings endpoint reported a failure.
    #[error("failed to create embedding: {0}")]
    EmbeddingCreation(String),

    /// The client could not be constructed from the given configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
