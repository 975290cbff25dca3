//! `config.toml` loading and `CLOUDMANAGER_*` environment overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::identity::{ImsContext, StaticIdentity, DEFAULT_BASE_URL, DEFAULT_CONTEXT_NAME};
use crate::poll::{PollPolicy, DEFAULT_POLL_INTERVAL};

/// Location of the config file unless `--config` says otherwise.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/cloudmanager/config.toml";

/// IMS org id for the active context.
pub const ENV_ORG_ID: &str = "CLOUDMANAGER_ORG_ID";
/// Client id (API key) for the active context.
pub const ENV_CLIENT_ID: &str = "CLOUDMANAGER_CLIENT_ID";
/// Access token for the active context.
pub const ENV_ACCESS_TOKEN: &str = "CLOUDMANAGER_ACCESS_TOKEN";
/// Overrides `cloudmanager.base_url`.
pub const ENV_BASE_URL: &str = "CLOUDMANAGER_BASE_URL";

/// On-disk CLI configuration (`config.toml`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `[cloudmanager]`
    #[serde(default)]
    pub cloudmanager: CloudManagerConfig,
    /// `[polling]`
    #[serde(default)]
    pub polling: PollingConfig,
    /// `[ims]`
    #[serde(default)]
    pub ims: ImsConfig,
}

/// Endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudManagerConfig {
    /// API endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CloudManagerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Poll cadence. Both values must be nonzero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Wait between polls.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Absent means poll until the execution finishes.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

/// Named IMS contexts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImsConfig {
    /// Name of the active context.
    #[serde(default = "default_context")]
    pub context: String,
    /// Credentials by context name.
    #[serde(default)]
    pub contexts: BTreeMap<String, ImsContext>,
}

impl Default for ImsConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            contexts: BTreeMap::new(),
        }
    }
}

fn default_context() -> String {
    DEFAULT_CONTEXT_NAME.to_string()
}

impl Config {
    /// [`DEFAULT_CONFIG_PATH`] with `~` expanded.
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned())
    }

    /// Reads and parses a TOML config file.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&s).map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))
    }

    /// Like [`Config::load_from`], but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Makes `name` the active context. `None` keeps the file's choice.
    ///
    /// Call before [`Config::apply_env`] so env credentials land under the
    /// selected name.
    pub fn select_context(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name {
            self.ims.context = name.to_string();
        }
        self
    }

    /// Applies `CLOUDMANAGER_*` overrides read through `var`.
    ///
    /// The three credential variables only take effect together; they replace
    /// the active context.
    pub fn apply_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var(ENV_BASE_URL).filter(|s| !s.is_empty()) {
            self.cloudmanager.base_url = url;
        }
        if let (Some(org_id), Some(client_id), Some(access_token)) =
            (var(ENV_ORG_ID), var(ENV_CLIENT_ID), var(ENV_ACCESS_TOKEN))
        {
            self.ims.contexts.insert(
                self.ims.context.clone(),
                ImsContext {
                    org_id,
                    client_id,
                    access_token,
                },
            );
        }
        self
    }

    /// Poll policy from `[polling]`; zero values are a config error.
    pub fn poll_policy(&self) -> Result<PollPolicy, Error> {
        let policy = PollPolicy::default()
            .with_interval(Duration::from_millis(self.polling.interval_ms))
            .with_max_attempts(self.polling.max_attempts);
        policy.validate()?;
        Ok(policy)
    }

    /// Identity for the active context.
    ///
    /// An unknown name yields an empty identity so the failure surfaces as an
    /// auth-context error when the command runs.
    pub fn identity(&self) -> StaticIdentity {
        let name = self.ims.context.as_str();
        match self.ims.contexts.get(name) {
            Some(ctx) => StaticIdentity::new(ctx.clone()).named(name),
            None => StaticIdentity::empty().named(name),
        }
    }
}
