// ── Runtime client configuration ──
//
// These types describe how the core talks to the backend and how long it
// keeps things around. They never touch disk: the CLI (or any other
// consumer) builds a `ClientConfig` and hands it in.

use std::sync::Arc;
use std::time::Duration;

use carehub_api::{SharedToken, StaticToken, TlsMode, TokenSource};
use secrecy::SecretString;
use url::Url;

/// Where the bearer token comes from.
#[derive(Debug, Clone, Default)]
pub enum TokenConfig {
    /// No token. Authenticated requests fail fast.
    #[default]
    None,
    /// Fixed token for the lifetime of the context.
    Static(SecretString),
    /// Token slot updated by the consumer (sign-in, refresh, sign-out).
    Shared(Arc<SharedToken>),
}

impl TokenConfig {
    pub(crate) fn into_source(self) -> Arc<dyn TokenSource> {
        match self {
            Self::None => Arc::new(StaticToken::none()),
            Self::Static(token) => Arc::new(StaticToken::from(Some(token))),
            Self::Shared(shared) => shared,
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

impl From<TlsVerification> for TlsMode {
    fn from(tls: TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Freshness and retention policy for cached queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Age after which a read triggers a silent background refetch.
    /// Zero means every read past the first refetches in the background.
    pub stale_time: Duration,
    /// How long an entry with no observers survives before GC.
    pub cache_time: Duration,
    /// Retries after a retryable failure (clamped to 0..=2).
    pub retry: u8,
    /// Pause between retries.
    pub retry_delay: Duration,
    /// How often the background sweeper runs. Zero disables it.
    pub gc_interval: Duration,
}

impl CacheOptions {
    pub const MAX_RETRY: u8 = 2;

    /// Effective retry count.
    pub fn retries(&self) -> u8 {
        self.retry.min(Self::MAX_RETRY)
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retry(mut self, retry: u8) -> Self {
        self.retry = retry.min(Self::MAX_RETRY);
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            cache_time: Duration::from_secs(5 * 60),
            retry: 1,
            retry_delay: Duration::from_millis(500),
            gc_interval: Duration::from_secs(60),
        }
    }
}

/// Configuration for one backend connection.
///
/// Built by the consumer and passed to `ClientContext`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://care.example/api`.
    pub base_url: Url,
    /// Bearer token source.
    pub token: TokenConfig,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Query cache policy.
    pub cache: CacheOptions,
    /// How long a notification stays visible.
    pub notification_duration: Duration,
    /// Quiet period before free-text input is applied.
    pub debounce: Duration,
    /// Initial page size for listings.
    pub page_size: u32,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: TokenConfig::None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            cache: CacheOptions::default(),
            notification_duration: Duration::from_secs(3),
            debounce: Duration::from_millis(600),
            page_size: 10,
        }
    }

    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.token = token;
        self
    }
}
