//! Engine configuration, loaded from YAML
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```yaml
//! project_prefixes: [ECP, IP]
//! tracker_base_url: https://esendex.atlassian.net
//! freshness_secs: 300
//! activation:
//!   host: commify.visualstudio.com
//!   path_markers: [_build, _pipeline]
//!   query_param: definitionId
//! timing:
//!   steady_debounce: 100
//! ```

use crate::ticket::{ExtractorError, TicketExtractor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid project prefixes: {0}")]
    Prefixes(#[from] ExtractorError),

    #[error("invalid tracker base URL {url:?}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("freshness_secs {0} is out of range")]
    Freshness(u64),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where and when the engine runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Exact host the engine activates on
    pub host: String,
    /// The path must contain at least one of these
    pub path_markers: Vec<String>,
    /// Query parameter that must be present; its value keys a logical page
    pub query_param: String,
    /// Path fragment marking build listings
    pub build_path_marker: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            host: "commify.visualstudio.com".to_string(),
            path_markers: vec!["_build".to_string(), "_pipeline".to_string()],
            query_param: "definitionId".to_string(),
            build_path_marker: "_build".to_string(),
        }
    }
}

/// Delays used by the mutation watcher, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub initial_delay: u64,
    pub priming_debounce: u64,
    pub steady_debounce: u64,
    pub scroll_debounce: u64,
    pub navigation_poll: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            initial_delay: 1000,
            priming_debounce: 500,
            steady_debounce: 100,
            scroll_debounce: 200,
            navigation_poll: 1000,
        }
    }
}

impl TimingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay)
    }

    pub fn priming_debounce(&self) -> Duration {
        Duration::from_millis(self.priming_debounce)
    }

    pub fn steady_debounce(&self) -> Duration {
        Duration::from_millis(self.steady_debounce)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce)
    }

    pub fn navigation_poll(&self) -> Duration {
        Duration::from_millis(self.navigation_poll)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub project_prefixes: Vec<String>,
    pub tracker_base_url: String,
    pub freshness_secs: u64,
    pub activation: ActivationConfig,
    pub timing: TimingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_prefixes: vec!["ECP".to_string(), "IP".to_string()],
            tracker_base_url: "https://esendex.atlassian.net".to_string(),
            freshness_secs: 300,
            activation: ActivationConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        // An empty document deserializes to unit, not to a struct
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// `<config_dir>/ticketmark/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ticketmark").join("config.yaml"))
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn discover(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.extractor()?;
        self.base_url()?;
        self.freshness()?;
        Ok(())
    }

    pub fn extractor(&self) -> ConfigResult<TicketExtractor> {
        Ok(TicketExtractor::new(&self.project_prefixes)?)
    }

    pub fn base_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.tracker_base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.tracker_base_url.clone(),
            source,
        })
    }

    /// How long a resolved status stays fresh in the cache
    pub fn freshness(&self) -> ConfigResult<chrono::Duration> {
        i64::try_from(self.freshness_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or(ConfigError::Freshness(self.freshness_secs))
    }
}
