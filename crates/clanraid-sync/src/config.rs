//! Client configuration.
//!
//! Settings come either from environment variables ([`SyncConfig::from_env`])
//! or from a YAML file ([`SyncConfig::from_file`]) whose values the same
//! environment variables override. Authentication is handled elsewhere; the
//! client only forwards an opaque session cookie if one is configured.

use std::path::Path;
use std::time::Duration;

use clanraid_types::GroupId;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::poller::PollSettings;

const ENV_BASE_URL: &str = "CLANRAID_BASE_URL";
const ENV_GROUP_ID: &str = "CLANRAID_GROUP_ID";
const ENV_SESSION_COOKIE: &str = "CLANRAID_SESSION_COOKIE";
const ENV_REQUEST_TIMEOUT_MS: &str = "CLANRAID_REQUEST_TIMEOUT_MS";
const ENV_CONNECT_TIMEOUT_MS: &str = "CLANRAID_CONNECT_TIMEOUT_MS";
const ENV_POLL_WAIT_SECS: &str = "CLANRAID_POLL_WAIT_SECS";
const ENV_POLL_TIMEOUT_SECS: &str = "CLANRAID_POLL_TIMEOUT_SECS";

/// Complete client configuration.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Public base path of the backend (e.g. `http://localhost:9222/yobot/`).
    pub base_url: String,
    /// Group whose boss is tracked.
    pub group_id: GroupId,
    /// Opaque `Cookie` header value for an already authenticated session.
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// Default deadline for one-shot calls, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// TCP connect deadline, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long the server may hold a long-poll open, in seconds.
    #[serde(default = "default_poll_wait_budget_secs")]
    pub poll_wait_budget_secs: u64,
    /// Client-side long-poll deadline, in seconds. Must exceed the wait budget.
    #[serde(default = "default_poll_hard_timeout_secs")]
    pub poll_hard_timeout_secs: u64,
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_poll_wait_budget_secs() -> u64 {
    30
}

const fn default_poll_hard_timeout_secs() -> u64 {
    40
}

impl core::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("base_url", &self.base_url)
            .field("group_id", &self.group_id)
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("poll_wait_budget_secs", &self.poll_wait_budget_secs)
            .field("poll_hard_timeout_secs", &self.poll_hard_timeout_secs)
            .finish()
    }
}

impl SyncConfig {
    /// Configuration with default timeouts.
    pub fn new(base_url: impl Into<String>, group_id: GroupId) -> Self {
        Self {
            base_url: base_url.into(),
            group_id,
            session_cookie: None,
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            poll_wait_budget_secs: default_poll_wait_budget_secs(),
            poll_hard_timeout_secs: default_poll_hard_timeout_secs(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `CLANRAID_BASE_URL` -- backend base path
    /// - `CLANRAID_GROUP_ID` -- tracked group
    ///
    /// Optional variables:
    /// - `CLANRAID_SESSION_COOKIE` -- forwarded `Cookie` header
    /// - `CLANRAID_REQUEST_TIMEOUT_MS` -- one-shot call deadline (default 10000)
    /// - `CLANRAID_CONNECT_TIMEOUT_MS` -- connect deadline (default 5000)
    /// - `CLANRAID_POLL_WAIT_SECS` -- server wait budget (default 30)
    /// - `CLANRAID_POLL_TIMEOUT_SECS` -- client poll deadline (default 40)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url =
            lookup(ENV_BASE_URL).ok_or_else(|| ConfigError::Missing(ENV_BASE_URL.to_owned()))?;
        let group_id = lookup(ENV_GROUP_ID)
            .ok_or_else(|| ConfigError::Missing(ENV_GROUP_ID.to_owned()))
            .and_then(|raw| parse_number(ENV_GROUP_ID, &raw))?;

        let mut config = Self::new(base_url, GroupId(group_id));
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents, |name| std::env::var(name).ok())
    }

    /// Parse configuration from a YAML string without environment overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml(yaml, |_| None)
    }

    /// Parse YAML, apply overrides from `lookup`, then validate the result.
    pub fn from_yaml(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_GROUP_ID) {
            self.group_id = GroupId(parse_number(ENV_GROUP_ID, &raw)?);
        }
        if let Some(cookie) = lookup(ENV_SESSION_COOKIE) {
            self.session_cookie = Some(cookie);
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms = parse_number(ENV_REQUEST_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout_ms = parse_number(ENV_CONNECT_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_WAIT_SECS) {
            self.poll_wait_budget_secs = parse_number(ENV_POLL_WAIT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_TIMEOUT_SECS) {
            self.poll_hard_timeout_secs = parse_number(ENV_POLL_TIMEOUT_SECS, &raw)?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("base_url is empty")));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "request_timeout_ms must be positive",
            )));
        }
        self.poll_settings().map(|_| ())
    }

    /// Full URL of the group's API endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/clan/{}/api/",
            self.base_url.trim_end_matches('/'),
            self.group_id
        )
    }

    /// Default deadline for one-shot calls.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// TCP connect deadline.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Long-poll timing, validated.
    pub fn poll_settings(&self) -> Result<PollSettings, ConfigError> {
        PollSettings::new(
            Duration::from_secs(self.poll_wait_budget_secs),
            Duration::from_secs(self.poll_hard_timeout_secs),
        )
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{name}={raw}: {e}")))
}
