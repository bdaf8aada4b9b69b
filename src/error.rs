//! Error types for the delivery client and the sync engine.
//!
//! The umbrella [`Error`] keeps the three failure families apart so callers can tell
//! "the request never produced data" ([`TransportError`]) from "data arrived but could
//! not be decoded" ([`DecodingError`]) from "the operation is not allowed with this
//! setup" ([`ConfigurationError`]).

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error returned by client and sync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A payload could not be decoded into typed resources.
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// The locale table or client configuration is invalid for the operation.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The transport failed before any data could be decoded.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Another sync run already holds the state.
    #[error("a sync run is already in progress for this state")]
    ConcurrentSync,
}

impl Error {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Malformed wire payloads.
#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("invalid `sys` block: {0}")]
    InvalidSys(String),

    #[error("unrecognized sys.type `{0}`")]
    UnknownType(String),

    #[error("expected a resource of type `{expected}`, found `{found}`")]
    UnexpectedType { expected: String, found: String },

    #[error("field `{field}` is not a locale-keyed map and the resource carries no sys.locale")]
    AmbiguousFields { field: String },

    #[error("resource `{id}` uses locale `{locale}` which is not in the locale table")]
    UnknownLocale { id: String, locale: String },

    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

/// Invalid locale tables and disallowed operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no default locale in locale table")]
    NoDefaultLocale,

    #[error("more than one default locale: `{first}` and `{second}`")]
    MultipleDefaultLocales { first: String, second: String },

    #[error("default locale `{0}` must not declare a fallback")]
    DefaultHasFallback(String),

    #[error("locale `{code}` falls back to unknown locale `{fallback}`")]
    DanglingFallback { code: String, fallback: String },

    #[error("fallback chain starting at `{0}` does not terminate")]
    FallbackCycle(String),

    #[error("duplicate locale code `{0}`")]
    DuplicateLocale(String),

    #[error("unknown locale `{0}`")]
    UnknownLocale(String),

    #[error("the wildcard locale `*` has no single projection")]
    WildcardProjection,

    #[error("synchronization is not available in preview mode")]
    PreviewSync,

    #[error("missing setting `{0}`")]
    MissingSetting(String),

    #[error("invalid value `{value}` for setting `{name}`")]
    InvalidSetting { name: String, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures reported by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other failure surfaced by a custom transport.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns true for a 429 rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status == 429,
            TransportError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            TransportError::Other(_) => false,
        }
    }

    /// Returns true for failures that a retry policy may repeat.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Http(e) => e.is_timeout() || e.is_connect(),
            TransportError::Other(_) => false,
        }
    }
}
