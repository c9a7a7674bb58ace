//! Shared configuration for carehub tools.
//!
//! TOML profiles, bearer-token resolution (env + keyring + plaintext),
//! and translation to `carehub_core::ClientConfig`. The core never reads
//! these types; consumers build a `ClientConfig` here and hand it in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use carehub_core::{CacheOptions, ClientConfig, TlsVerification, TokenConfig};

/// Service name under which tokens are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "carehub";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile named by `requested`, else `default_profile`, else "default".
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// Profile names in sorted order.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Rows per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Free-text search debounce in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Seconds a cached query counts as fresh.
    #[serde(default)]
    pub stale_secs: u64,

    /// Automatic retries for failed reads (0 to 2).
    #[serde(default = "default_retry")]
    pub retry: u8,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
            debounce_ms: default_debounce_ms(),
            stale_secs: 0,
            retry: default_retry(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    10
}
fn default_debounce_ms() -> u64 {
    600
}
fn default_retry() -> u8 {
    1
}

/// A named backend profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g., "https://care.example.org/api").
    pub api_url: String,

    /// Bearer token (plaintext, prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "carehub", "carehub").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("carehub");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, still layering `CAREHUB_` variables on
/// top. Nested keys use a double underscore: `CAREHUB_DEFAULTS__PAGE_SIZE`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAREHUB_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_key(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

/// Resolve a bearer token for `profile`.
///
/// Order: the variable named by `token_env`, the system keyring, then the
/// plaintext `token`. `None` is not an error; requests that need a token
/// fail with `CoreError::Unauthenticated` instead.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_token_with(
        profile,
        |var| std::env::var(var).ok(),
        || {
            keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_token_with(
    profile: &Profile,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<SecretString> {
    // 1. Profile's token_env -> env var lookup
    if let Some(token) = profile.token_env.as_deref().and_then(&env) {
        return Some(SecretString::from(token));
    }

    // 2. System keyring
    if let Some(token) = keyring() {
        return Some(SecretString::from(token));
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Store a token for `profile_name` in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `ClientConfig` from a profile and the global defaults.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let token = resolve_token(profile, profile_name).map_or(TokenConfig::None, TokenConfig::Static);
    client_config_with_token(profile, defaults, token)
}

/// Like [`profile_to_client_config`], with a token the caller already has.
pub fn client_config_with_token(
    profile: &Profile,
    defaults: &Defaults,
    token: TokenConfig,
) -> Result<ClientConfig, ConfigError> {
    let url: url::Url = profile.api_url.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {}", profile.api_url),
    })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    if defaults.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    let mut config = ClientConfig::new(url).with_token(token);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.cache = CacheOptions::default()
        .with_stale_time(Duration::from_secs(defaults.stale_secs))
        .with_retry(defaults.retry);
    config.page_size = defaults.page_size;
    config.debounce = Duration::from_millis(defaults.debounce_ms);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.page_size, 10);
        assert_eq!(cfg.defaults.debounce_ms, 600);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_and_defaults_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "north"

[defaults]
page_size = 5
retry = 2

[profiles.north]
api_url = "https://north.example.org/api"
token_env = "NORTH_TOKEN"
timeout = 10

[profiles.south]
api_url = "https://south.example.org/api"
insecure = true
"#,
        );
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.active_profile_name(None), "north");
        assert_eq!(cfg.active_profile_name(Some("south")), "south");
        assert_eq!(cfg.profile_names(), vec!["north", "south"]);
        assert_eq!(cfg.defaults.page_size, 5);
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.profile("north").unwrap().timeout, Some(10));
        assert!(matches!(
            cfg.profile("east"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                api_url: "https://home.example.org/api".into(),
                ca_cert: Some("/etc/ca.pem".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("token"));

        let loaded = load_config_from(&path).unwrap();
        let home = loaded.profile("home").unwrap();
        assert_eq!(home.api_url, "https://home.example.org/api");
        assert_eq!(home.ca_cert.as_deref(), Some(Path::new("/etc/ca.pem")));
    }

    #[test]
    fn token_env_wins_over_keyring_and_plaintext() {
        let profile = Profile {
            token: Some("plain".into()),
            token_env: Some("HOME_TOKEN".into()),
            ..Profile::default()
        };
        let token = resolve_token_with(
            &profile,
            |var| (var == "HOME_TOKEN").then(|| "from-env".to_owned()),
            || Some("from-keyring".to_owned()),
        );
        assert_eq!(token.unwrap().expose_secret(), "from-env");
    }

    #[test]
    fn keyring_then_plaintext_then_none() {
        let mut profile = Profile {
            token: Some("plain".into()),
            token_env: Some("UNSET".into()),
            ..Profile::default()
        };
        let token = resolve_token_with(&profile, |_| None, || Some("from-keyring".to_owned()));
        assert_eq!(token.unwrap().expose_secret(), "from-keyring");

        let token = resolve_token_with(&profile, |_| None, || None);
        assert_eq!(token.unwrap().expose_secret(), "plain");

        profile.token = None;
        assert!(resolve_token_with(&profile, |_| None, || None).is_none());
    }

    #[test]
    fn client_config_applies_profile_and_defaults() {
        let defaults = Defaults {
            page_size: 5,
            stale_secs: 30,
            retry: 9,
            ..Defaults::default()
        };
        let profile = Profile {
            api_url: "https://care.example.org/api".into(),
            ca_cert: Some("/etc/ca.pem".into()),
            timeout: Some(12),
            ..Profile::default()
        };
        let config = client_config_with_token(&profile, &defaults, TokenConfig::None).unwrap();
        assert_eq!(config.base_url.as_str(), "https://care.example.org/api");
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.page_size, 5);
        assert_eq!(config.debounce, Duration::from_millis(600));
        assert_eq!(config.cache.stale_time, Duration::from_secs(30));
        assert_eq!(config.cache.retry, 2);
    }

    #[test]
    fn insecure_overrides_custom_ca() {
        let profile = Profile {
            api_url: "https://care.example.org".into(),
            ca_cert: Some("/etc/ca.pem".into()),
            insecure: Some(true),
            ..Profile::default()
        };
        let config = client_config_with_token(&profile, &Defaults::default(), TokenConfig::None).unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let profile = Profile {
            api_url: "not a url".into(),
            ..Profile::default()
        };
        let err = client_config_with_token(&profile, &Defaults::default(), TokenConfig::None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
    }
}
