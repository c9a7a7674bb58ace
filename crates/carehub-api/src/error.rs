use thiserror::Error;

/// A validation message the backend attached to a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

/// Top-level error type for the `carehub-api` crate.
///
/// Covers every failure mode of a resource request: missing credentials,
/// transport, non-2xx responses, and bodies that don't parse.
/// `carehub-core` maps these into cache flags and notifications.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// No bearer token available. Raised before any request is sent.
    #[error("Not authenticated -- no bearer token available")]
    Unauthenticated,

    /// The backend rejected the token (HTTP 401).
    #[error("Session expired -- the server rejected the bearer token")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-2xx response, possibly carrying field-level validation messages.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        field_errors: Vec<FieldError>,
    },

    /// HTTP 409: the entity is referenced elsewhere and cannot be changed.
    #[error("Conflict: {message}")]
    ConflictInUse { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// 2xx response whose body doesn't match the expected shape.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },
}

impl Error {
    /// Returns `true` if the caller should obtain a new token.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }

    /// HTTP status code, if the request reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::ConflictInUse { .. } => Some(409),
            Self::SessionExpired => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
