use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::rchain::chat_models::{ClientConfig, ErrorPolicy};
use crate::rchain::provider::Preset;
use crate::rchain::retry::{RetryLimit, RetryPolicy};

/// One `[profiles.<name>]` table. Unset fields fall back to the preset.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientProfile {
    pub preset: Preset,
    #[serde(default)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub max_attempts: Option<u32>,
    pub error_policy: Option<ErrorPolicyProfile>,
}

/// `[profiles.<name>.error_policy]`, selected by `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ErrorPolicyProfile {
    RaiseWithRetry,
    SwallowAndSentinel {
        #[serde(default)]
        timeout_sentinel: String,
        #[serde(default)]
        failure_sentinel: String,
    },
}

impl From<ErrorPolicyProfile> for ErrorPolicy {
    fn from(profile: ErrorPolicyProfile) -> Self {
        match profile {
            ErrorPolicyProfile::RaiseWithRetry => Self::RaiseWithRetry(RetryPolicy::default()),
            ErrorPolicyProfile::SwallowAndSentinel {
                timeout_sentinel,
                failure_sentinel,
            } => Self::SwallowAndSentinel {
                timeout_sentinel,
                failure_sentinel,
            },
        }
    }
}

impl ClientProfile {
    pub fn into_config(self) -> ClientConfig {
        let mut config = ClientConfig::from_preset(self.preset, self.api_key);
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config = config.with_timeout(Some(Duration::from_secs(timeout_secs)));
        }
        if let Some(proxy) = self.proxy {
            config = config.with_proxy(proxy);
        }
        if let Some(error_policy) = self.error_policy {
            config = config.with_error_policy(error_policy.into());
        }
        if let Some(max_attempts) = self.max_attempts {
            config = config.with_retry_limit(RetryLimit::MaxAttempts(max_attempts));
        }
        config
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ClientProfile>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {source}")]
    Parse { source: toml::de::Error },

    #[error("config does not contain a [profiles] section")]
    MissingProfiles,

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },
}

pub fn parse_profiles(raw: &str) -> Result<HashMap<String, ClientProfile>, ConfigError> {
    let config: ConfigFile =
        toml::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
    config.profiles.ok_or(ConfigError::MissingProfiles)
}

pub fn load_profile(path: &Path, name: &str) -> Result<ClientConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut profiles = parse_profiles(&raw)?;
    let profile = profiles
        .remove(name)
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
        })?;
    Ok(profile.into_config())
}
