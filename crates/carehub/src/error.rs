//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use carehub_config::ConfigError;
use carehub_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend")]
    #[diagnostic(
        code(carehub::connection_failed),
        help(
            "Check that the backend is running and the API URL is correct.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("No bearer token available for profile '{profile}'")]
    #[diagnostic(
        code(carehub::no_token),
        help(
            "Store one with: carehub config set-token {profile}\n\
             Or pass --token / set CAREHUB_TOKEN."
        )
    )]
    NoToken { profile: String },

    #[error("Session expired or token rejected")]
    #[diagnostic(
        code(carehub::auth_failed),
        help("Sign in again and refresh the stored token: carehub config set-token {profile}")
    )]
    AuthFailed { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(carehub::forbidden))]
    PermissionDenied { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(carehub::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(carehub::conflict),
        help("Remove the records that reference it first.")
    )]
    Conflict { message: String },

    #[error("A write is already in progress for {resource}")]
    #[diagnostic(code(carehub::busy))]
    Busy { resource: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error: {message}")]
    #[diagnostic(code(carehub::api_error))]
    ApiError { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(carehub::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(carehub::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: carehub config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(carehub::no_config),
        help(
            "Create one with: carehub config init\n\
             Or pass --api-url. Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(carehub::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(carehub::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(carehub::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(carehub::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(carehub::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoToken { .. } | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::Busy { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in the profile name on auth errors raised below the CLI.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::NoToken { .. } => Self::NoToken { profile: name.into() },
            Self::AuthFailed { .. } => Self::AuthFailed { profile: name.into() },
            other => other,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.user_message();
        match err {
            CoreError::Unauthenticated => CliError::NoToken {
                profile: "current".into(),
            },
            CoreError::SessionExpired => CliError::AuthFailed {
                profile: "current".into(),
            },
            CoreError::NetworkFailure { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ConflictInUse { .. } => CliError::Conflict { message },
            CoreError::MutationInFlight { resource } => CliError::Busy { resource },
            CoreError::Server { status: 403, .. } => CliError::PermissionDenied { message },
            CoreError::Server { status: 404, .. } => CliError::NotFound { message },
            CoreError::Server {
                status: 400 | 422, ..
            } => CliError::Validation {
                field: "body".into(),
                reason: message,
            },
            CoreError::Server { status, .. } => CliError::ApiError {
                status: Some(status),
                message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::MalformedResponse { message } | CoreError::Internal(message) => {
                CliError::ApiError {
                    status: None,
                    message,
                }
            }
        }
    }
}
