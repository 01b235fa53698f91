//! Static bot configuration, read once at startup.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_STORIES_FILE: &str = "stories.jsonl";
const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No CHANNEL_ID configured - set the CHANNEL_ID environment variable")]
    MissingChannel,

    #[error("Invalid publish mode {0:?} (expected \"auto\" or \"manual\")")]
    InvalidMode(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Whether new stories go to the channel right away or wait for an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Publish every accepted story immediately.
    #[default]
    Auto,
    /// Store only; an admin publishes with `/post`.
    Manual,
}

impl FromStr for PublishMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "true" | "1" | "on" => Ok(PublishMode::Auto),
            "manual" | "false" | "0" | "off" => Ok(PublishMode::Manual),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// The fixed set of users allowed to list and publish stories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegedUsers(HashSet<i64>);

impl PrivilegedUsers {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Parse a comma-separated id list such as `"123, 456"`.
    ///
    /// Blank entries are skipped; a single malformed entry rejects the list.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                    name: "ADMIN_IDS",
                    reason: format!("{s:?}: {e}"),
                })
            })
            .collect::<Result<HashSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.0.contains(&user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted ids, for logging.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<_> = self.0.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Configuration shared by both pipelines.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Auto-publish or manual moderation.
    pub mode: PublishMode,

    /// Users who may run admin commands.
    pub privileged: PrivilegedUsers,

    /// Channel the publisher posts to (numeric id or `@username`).
    pub channel: String,

    /// Location of the story log.
    pub stories_path: PathBuf,

    /// Upper bound on a single publish call.
    pub publish_timeout: Duration,
}

impl BotConfig {
    /// Create a config for the given channel with defaults for everything else.
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            mode: PublishMode::default(),
            privileged: PrivilegedUsers::default(),
            channel: channel.into(),
            stories_path: PathBuf::from(DEFAULT_STORIES_FILE),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Build the config from environment variables.
    ///
    /// - `CHANNEL_ID` (required)
    /// - `ADMIN_IDS`: comma-separated user ids; unparsable lists are logged
    ///   and treated as empty
    /// - `STORY_PUBLISH_MODE`: `auto` (default) or `manual`
    /// - `STORIES_FILE`: log path, default `stories.jsonl`
    /// - `PUBLISH_TIMEOUT_SECS`: default 15
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let channel = lookup("CHANNEL_ID")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingChannel)?;

        let mut config = Self::new(channel);

        if let Some(list) = lookup("ADMIN_IDS") {
            config.privileged = PrivilegedUsers::parse(&list).unwrap_or_else(|e| {
                tracing::error!(error = %e, "ignoring ADMIN_IDS, no admins configured");
                PrivilegedUsers::default()
            });
        }

        if let Some(mode) = lookup("STORY_PUBLISH_MODE") {
            config.mode = mode.parse()?;
        }

        if let Some(path) = lookup("STORIES_FILE").filter(|p| !p.trim().is_empty()) {
            config.stories_path = PathBuf::from(path.trim());
        }

        if let Some(secs) = lookup("PUBLISH_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: "PUBLISH_TIMEOUT_SECS",
                reason: format!("{secs:?}: {e}"),
            })?;
            config.publish_timeout = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    /// Set the publication mode.
    pub fn with_mode(mut self, mode: PublishMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the privileged user ids.
    pub fn with_admins(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.privileged = PrivilegedUsers::new(ids);
        self
    }

    /// Set the story log path.
    pub fn with_stories_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stories_path = path.into();
        self
    }

    /// Set the publish timeout.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// The `is_privileged` check used by every admin operation.
    pub fn is_privileged(&self, user_id: i64) -> bool {
        self.privileged.contains(user_id)
    }
}
