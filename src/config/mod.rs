//! Run configuration loaded from a TOML file.
//!
//! The file is read through a `cap-std` directory handle opened on its
//! parent. Credentials may be left out of the file and supplied through
//! [`TRACKER_TOKEN_ENV`] and [`HOST_TOKEN_ENV`] instead.
//!
//! A minimal file:
//!
//! ```toml
//! [tracker]
//! base_url = "https://acme.atlassian.net"
//! username = "sync-bot"
//! link_field_name = "GitHub Link"
//! link_field_id = "customfield_22000"
//! project_key = "OPS"
//! board_id = "42"
//!
//! [host]
//! owner = "acme"
//! repository = "api"
//! users = ["alice", "bob"]
//! ```

use crate::sync::{
    adapters::{GitHubSettings, JiraSettings, github::DEFAULT_API_BASE_URL},
    domain::{RepositoryRef, WorkflowPolicy},
    services::{GeneratorSettings, RunSettings, SnapshotRequest},
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::TimeDelta;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Path read when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "ticketsync.toml";
/// Environment variable overriding `tracker.token`.
pub const TRACKER_TOKEN_ENV: &str = "TICKETSYNC_TRACKER_TOKEN";
/// Environment variable overriding `host.token`.
pub const HOST_TOKEN_ENV: &str = "TICKETSYNC_HOST_TOKEN";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// A value is missing or out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Issue-tracker section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Instance root.
    pub base_url: Url,
    /// Basic-auth account.
    pub username: String,
    /// API token; usually supplied through [`TRACKER_TOKEN_ENV`].
    #[serde(default)]
    pub token: String,
    /// Link field name used in searches.
    pub link_field_name: String,
    /// Link field ID used in payloads and custom-field reads.
    pub link_field_id: String,
    /// Project generated tickets are filed in.
    pub project_key: String,
    /// Board whose active iteration receives generated tickets.
    pub board_id: String,
    /// Issue type of generated tickets.
    #[serde(default = "default_issue_type")]
    pub new_issue_type: String,
    /// Custom-field ID of the team field.
    #[serde(default)]
    pub team_field_id: Option<String>,
    /// Team written into `team_field_id` on generated tickets.
    #[serde(default)]
    pub team_id: Option<String>,
    /// Search page size.
    #[serde(default = "default_tracker_page_size")]
    pub page_size: u32,
}

/// Code-host section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// API root.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token; usually supplied through [`HOST_TOKEN_ENV`].
    #[serde(default)]
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Logins whose pull requests are tracked.
    pub users: Vec<String>,
    /// Labels the issue preload is filtered by.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Listing page size.
    #[serde(default = "default_host_page_size")]
    pub page_size: u32,
}

/// Ticket generator section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Whether untracked pull requests get tickets.
    pub enabled: bool,
    /// Minimum pull request age in seconds.
    pub min_age_secs: u64,
    /// Code-host login to tracker account.
    pub user_mapping: BTreeMap<String, String>,
    /// Summary template.
    pub summary_template: String,
    /// Description template.
    pub description_template: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_age_secs: 3600,
            user_mapping: BTreeMap::new(),
            summary_template: "{{ title }}".to_owned(),
            description_template: "{{ body }}".to_owned(),
        }
    }
}

/// Scheduling section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// In-flight task limit per fan-out.
    pub max_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

/// Complete configuration of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Issue tracker.
    pub tracker: TrackerConfig,
    /// Code host.
    pub host: HostConfig,
    /// Status vocabulary.
    #[serde(default)]
    pub workflow: WorkflowPolicy,
    /// Ticket generation.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Scheduling.
    #[serde(default)]
    pub run: RunConfig,
}

impl SyncConfig {
    /// Parses configuration text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, unknown keys, or
    /// missing required keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(Box::new(err)))
    }

    /// Replaces tokens with values found through `lookup`.
    ///
    /// Empty values are ignored so that an unset variable never blanks a
    /// token given in the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TRACKER_TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.tracker.token = token;
        }
        if let Some(token) = lookup(HOST_TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.host.token = token;
        }
    }

    /// Checks required values and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("tracker.username", &self.tracker.username),
            ("tracker.token", &self.tracker.token),
            ("tracker.link_field_name", &self.tracker.link_field_name),
            ("tracker.link_field_id", &self.tracker.link_field_id),
            ("tracker.project_key", &self.tracker.project_key),
            ("tracker.board_id", &self.tracker.board_id),
            ("tracker.new_issue_type", &self.tracker.new_issue_type),
            ("host.token", &self.host.token),
            ("host.owner", &self.host.owner),
            ("host.repository", &self.host.repository),
        ];
        if let Some((field, _)) = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(invalid(field, "must not be empty"));
        }
        if self.host.users.iter().all(|user| user.trim().is_empty()) {
            return Err(invalid("host.users", "at least one login is required"));
        }
        if self.tracker.page_size == 0 {
            return Err(invalid("tracker.page_size", "must be at least 1"));
        }
        if self.host.page_size == 0 {
            return Err(invalid("host.page_size", "must be at least 1"));
        }
        if self.run.max_concurrency == 0 {
            return Err(invalid("run.max_concurrency", "must be at least 1"));
        }
        if self.tracker.team_id.is_some() && self.tracker.team_field_id.is_none() {
            return Err(invalid(
                "tracker.team_field_id",
                "required when tracker.team_id is set",
            ));
        }
        self.api_base_url()?;
        self.min_age()?;
        Ok(())
    }

    /// Returns the repository whose pull requests are tracked.
    #[must_use]
    pub fn repository(&self) -> RepositoryRef {
        RepositoryRef::new(&self.host.owner, &self.host.repository)
    }

    /// Settings for the Jira adapter.
    #[must_use]
    pub fn jira_settings(&self) -> JiraSettings {
        JiraSettings {
            base_url: self.tracker.base_url.clone(),
            username: self.tracker.username.clone(),
            token: self.tracker.token.clone(),
            link_field_name: self.tracker.link_field_name.clone(),
            link_field_id: self.tracker.link_field_id.clone(),
            team_field_id: self.tracker.team_field_id.clone(),
        }
    }

    /// Settings for the GitHub adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `host.api_base_url` is not an
    /// absolute URL.
    pub fn github_settings(&self) -> Result<GitHubSettings, ConfigError> {
        Ok(GitHubSettings {
            api_base_url: self.api_base_url()?,
            token: self.host.token.clone(),
        })
    }

    /// Builds the run settings.
    ///
    /// Generation is left out when it is disabled in the file or
    /// `skip_generation` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the minimum age is out of range.
    pub fn run_settings(&self, skip_generation: bool) -> Result<RunSettings, ConfigError> {
        let generator = if self.generator.enabled && !skip_generation {
            Some(self.generator_settings()?)
        } else {
            None
        };
        Ok(RunSettings {
            snapshot: SnapshotRequest {
                repository: self.repository(),
                users: self
                    .host
                    .users
                    .iter()
                    .map(|user| user.trim().to_owned())
                    .filter(|user| !user.is_empty())
                    .collect(),
                labels: self.host.labels.clone(),
                excluded_statuses: self.workflow.terminal_statuses.clone(),
                ticket_page_size: self.tracker.page_size,
                host_page_size: self.host.page_size,
            },
            policy: self.workflow.clone(),
            link_field_id: self.tracker.link_field_id.clone(),
            generator,
            max_concurrency: self.run.max_concurrency,
        })
    }

    fn generator_settings(&self) -> Result<GeneratorSettings, ConfigError> {
        Ok(GeneratorSettings {
            project_key: self.tracker.project_key.clone(),
            issue_type: self.tracker.new_issue_type.clone(),
            min_age: self.min_age()?,
            user_mapping: self.generator.user_mapping.clone(),
            team_id: self.tracker.team_id.clone(),
            board_id: self.tracker.board_id.clone(),
            summary_template: self.generator.summary_template.clone(),
            description_template: self.generator.description_template.clone(),
        })
    }

    fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.host.api_base_url)
            .map_err(|err| invalid("host.api_base_url", &err.to_string()))
    }

    fn min_age(&self) -> Result<TimeDelta, ConfigError> {
        i64::try_from(self.generator.min_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| invalid("generator.min_age_secs", "out of range"))
    }
}

/// Reads, overrides from the process environment, and validates the file
/// at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: &Utf8Path) -> Result<SyncConfig, ConfigError> {
    let text = read_file(path)?;
    let mut config = SyncConfig::from_toml_str(&text)?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

fn read_file(path: &Utf8Path) -> Result<String, ConfigError> {
    let read_error = |source| ConfigError::Read {
        path: path.to_owned(),
        source,
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::other("path must include a file name"))
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    dir.read_to_string(file_name).map_err(read_error)
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn default_issue_type() -> String {
    "Task".to_owned()
}

const fn default_tracker_page_size() -> u32 {
    50
}

const fn default_host_page_size() -> u32 {
    100
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}
