//! `trove.toml` configuration and logging setup.

mod logging;

pub use logging::{init_tracing, LoggingConfig};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Cache root. `TROVE_CACHE_DIR` and then `~/.trove/cache` apply when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of a Maven-layout model repository. Local-only when unset.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Local repository directory; defaults to `<cache root>/repository`.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    #[serde(default = "RepositoryConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Model index file; defaults to `<cache root>/index.json`.
    #[serde(default)]
    pub index: Option<PathBuf>,
}

impl RepositoryConfig {
    fn default_timeout_ms() -> u64 {
        30_000
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            local_dir: None,
            timeout_ms: Self::default_timeout_ms(),
            index: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Threads for resolution jobs; derived from available parallelism when unset.
    #[serde(default)]
    pub background_threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Idle model instances kept per key for reuse.
    #[serde(default = "ArchiveConfig::default_max_idle_per_key")]
    pub max_idle_per_key: usize,
}

impl ArchiveConfig {
    fn default_max_idle_per_key() -> usize {
        4
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_idle_per_key: Self::default_max_idle_per_key(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroveConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` includes a source snippet; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED: OnceLock<regex::Regex> = OnceLock::new();
    static UNKNOWN: OnceLock<regex::Regex> = OnceLock::new();

    let quoted = QUOTED.get_or_init(|| {
        regex::Regex::new(r#""(?:\\.|[^"\\])*""#).expect("quoted-string regex should compile")
    });
    let out = quoted.replace_all(message, r#""<redacted>""#);

    // Unknown fields and variants are user input; `missing field` names are schema.
    let unknown = UNKNOWN.get_or_init(|| {
        regex::Regex::new(r"(unknown (?:field|variant)) `[^`]*`")
            .expect("unknown-field regex should compile")
    });
    unknown
        .replace_all(&out, "$1 `<redacted>`")
        .into_owned()
}

/// Problems that do not prevent loading but are worth surfacing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Dotted paths of keys the schema does not know, e.g. `repository.remote_ulr`.
    pub unknown_keys: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty()
    }
}

impl TroveConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_from_path_with_diagnostics(path).map(|(config, _)| config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str_with_diagnostics(&text)
    }

    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) = deserialize_with_unknown_keys::<TroveConfig>(text)?;
        let warnings = config.validate();
        Ok((
            config,
            ConfigDiagnostics {
                unknown_keys,
                warnings,
            },
        ))
    }

    fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.repository.timeout_ms == 0 {
            warnings.push("repository.timeout_ms: must be >= 1".to_owned());
        }
        if self.scheduler.background_threads == Some(0) {
            warnings.push("scheduler.background_threads: must be >= 1".to_owned());
        }
        if let Some(url) = &self.repository.remote_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push("repository.remote_url: expected an http(s) URL".to_owned());
            }
        }
        if !self.logging.level_is_valid() {
            warnings.push("logging.level: not a valid filter directive".to_owned());
        }
        warnings
    }
}

fn deserialize_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string().trim_start_matches('.').to_owned());
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}
