//! CLI configuration: thin wrapper around `carehub_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--api-url, --token, --insecure, ...).

use std::time::Duration;

use secrecy::SecretString;

use carehub_core::{ClientConfig, TlsVerification, TokenConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use carehub_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
    store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let names = config.profile_names();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build the `ClientConfig` for this invocation.
///
/// Returns the profile name alongside it for error messages. Flags take
/// priority over profile values, which take priority over defaults.
pub fn build_client_config(global: &GlobalOpts) -> Result<(ClientConfig, String), CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly requested profile must exist
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        // No profile: run from flags / env vars alone
        None => Profile {
            api_url: global.api_url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?,
            ..Profile::default()
        },
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    let mut client = match global.token {
        Some(ref token) => {
            let token = TokenConfig::Static(SecretString::from(token.clone()));
            carehub_config::client_config_with_token(&profile, &cfg.defaults, token)?
        }
        None => carehub_config::profile_to_client_config(&profile, &profile_name, &cfg.defaults)?,
    };
    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }

    Ok((client, profile_name))
}
