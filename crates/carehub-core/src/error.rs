// ── Core error types ──
//
// Errors consumers of carehub-core see. The `From<carehub_api::Error>`
// impl folds transport-layer failures into the taxonomy the cache,
// mutation tracker and listing work with.

use carehub_api::FieldError;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in -- no bearer token available")]
    Unauthenticated,

    #[error("Session expired")]
    SessionExpired,

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Network failure: {reason}")]
    NetworkFailure { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Server responses ─────────────────────────────────────────────
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        field_errors: Vec<FieldError>,
    },

    #[error("Conflict: {message}")]
    ConflictInUse { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("A mutation on {resource} is already in flight")]
    MutationInFlight { resource: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

impl CoreError {
    /// Whether a failed fetch may be retried within the retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkFailure { .. } | Self::Timeout { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code, if the request reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::ConflictInUse { .. } => Some(409),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// The most specific message that can be shown to a user.
    ///
    /// Field-level validation messages win, then a message the backend
    /// supplied, then one derived from the HTTP status, then a fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "You are not signed in.".into(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".into(),
            Self::NetworkFailure { .. } => "Could not reach the server.".into(),
            Self::Timeout { .. } => "The server took too long to respond.".into(),
            Self::ConflictInUse { .. } => {
                "This record is already in use and cannot be changed.".into()
            }
            Self::Server {
                status,
                message,
                field_errors,
            } => {
                let fields: Vec<String> = field_errors
                    .iter()
                    .flat_map(|f| {
                        f.messages.iter().map(move |m| {
                            if f.field.is_empty() {
                                m.clone()
                            } else {
                                format!("{}: {m}", f.field)
                            }
                        })
                    })
                    .collect();
                if !fields.is_empty() {
                    return fields.join("\n");
                }
                if !message.is_empty() && !is_status_text(message, *status) {
                    return message.clone();
                }
                status_message(*status).map_or_else(|| FALLBACK_MESSAGE.to_owned(), str::to_owned)
            }
            _ => FALLBACK_MESSAGE.into(),
        }
    }
}

/// `reqwest` renders bare statuses as e.g. "400 Bad Request".
fn is_status_text(message: &str, status: u16) -> bool {
    message.starts_with(&status.to_string())
}

fn status_message(status: u16) -> Option<&'static str> {
    Some(match status {
        400 => "The request was invalid.",
        403 => "You do not have permission to perform this action.",
        404 => "The record could not be found.",
        422 => "Some fields are invalid.",
        500..=599 => "The server encountered an error.",
        _ => return None,
    })
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<carehub_api::Error> for CoreError {
    fn from(err: carehub_api::Error) -> Self {
        match err {
            carehub_api::Error::Unauthenticated => CoreError::Unauthenticated,
            carehub_api::Error::SessionExpired => CoreError::SessionExpired,
            carehub_api::Error::Transport(e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::NetworkFailure {
                        reason: e.to_string(),
                    }
                }
            }
            carehub_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            carehub_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            carehub_api::Error::Tls(msg) => CoreError::NetworkFailure {
                reason: format!("TLS error: {msg}"),
            },
            carehub_api::Error::Server {
                status,
                message,
                field_errors,
            } => CoreError::Server {
                status,
                message,
                field_errors,
            },
            carehub_api::Error::ConflictInUse { message } => CoreError::ConflictInUse { message },
            carehub_api::Error::MalformedResponse { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
