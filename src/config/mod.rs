use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Name of the current-config key holding the analysis dispatcher URL.
pub const DISPATCHER_CONFIG_KEY: &str = "jibri.analysis.dispatcher";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No dispatcher url configured: set `dispatcherUrl` in the legacy config or `{}`", DISPATCHER_CONFIG_KEY)]
    MissingDispatcherUrl,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub worker: WorkerConfig,
    pub webhook: WebhookConfig,
    /// `[analysis]` maps to the `jibri.analysis.*` keys.
    pub analysis: AnalysisConfig,
    pub legacy: LegacySourceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Identity sent as `jibriId` in every webhook event
    pub id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: "capture-worker".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Base URLs; events are POSTed to `<url>/v1/status`
    pub subscribers: Vec<String>,
    /// Per-request timeout for each subscriber send (default: 10)
    pub request_timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub dispatcher: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySourceConfig {
    /// Path to a legacy JSON config file, if one is still deployed
    pub config_path: Option<PathBuf>,
}

/// Legacy JSON config. Only the fields this worker reads are modelled.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyConfig {
    pub dispatcher_url: Option<String>,
}

impl LegacyConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read legacy config {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse legacy config {:?}", path))?;
        info!("Loaded legacy config from {:?}", path);
        Ok(config)
    }
}

/// The two places a dispatcher URL may come from, in precedence order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatcherUrlSources {
    pub legacy: Option<String>,
    pub configured: Option<String>,
}

impl DispatcherUrlSources {
    pub fn new(legacy: Option<&LegacyConfig>, config: &AnalysisConfig) -> Self {
        Self {
            legacy: legacy.and_then(|l| l.dispatcher_url.clone()),
            configured: config.dispatcher.clone(),
        }
    }

    /// Legacy wins when it holds a value; blank values count as unset.
    pub fn resolve(&self) -> std::result::Result<String, ConfigError> {
        [&self.legacy, &self.configured]
            .into_iter()
            .flatten()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or(ConfigError::MissingDispatcherUrl)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Reads the legacy source named by `[legacy].config_path`, if any.
    pub fn legacy_config(&self) -> Result<Option<LegacyConfig>> {
        match &self.legacy.config_path {
            Some(path) => LegacyConfig::load(path).map(Some),
            None => Ok(None),
        }
    }

    pub fn dispatcher_sources(&self) -> Result<DispatcherUrlSources> {
        let legacy = self.legacy_config()?;
        Ok(DispatcherUrlSources::new(legacy.as_ref(), &self.analysis))
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(legacy: Option<&str>, configured: Option<&str>) -> DispatcherUrlSources {
        DispatcherUrlSources {
            legacy: legacy.map(String::from),
            configured: configured.map(String::from),
        }
    }

    #[test]
    fn test_dispatcher_legacy_only() {
        assert_eq!(
            sources(Some("http://legacy:8080"), None).resolve(),
            Ok("http://legacy:8080".to_string())
        );
    }

    #[test]
    fn test_dispatcher_configured_only() {
        assert_eq!(
            sources(None, Some("http://dispatcher:9000")).resolve(),
            Ok("http://dispatcher:9000".to_string())
        );
    }

    #[test]
    fn test_dispatcher_legacy_wins() {
        assert_eq!(
            sources(Some("http://legacy:8080"), Some("http://dispatcher:9000")).resolve(),
            Ok("http://legacy:8080".to_string())
        );
    }

    #[test]
    fn test_dispatcher_missing() {
        assert_eq!(
            sources(None, None).resolve(),
            Err(ConfigError::MissingDispatcherUrl)
        );
        assert_eq!(
            sources(Some("  "), None).resolve(),
            Err(ConfigError::MissingDispatcherUrl)
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.worker.id, "capture-worker");
        assert!(config.webhook.subscribers.is_empty());
        assert_eq!(config.webhook.request_timeout_seconds, 10);
        assert!(config.analysis.dispatcher.is_none());
    }

    #[test]
    fn test_load_from_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[worker]
id = "worker-7"

[webhook]
subscribers = ["http://manager:8080"]

[analysis]
dispatcher = "http://dispatcher:9000"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.worker.id, "worker-7");
        assert_eq!(config.webhook.subscribers, vec!["http://manager:8080"]);
        assert_eq!(config.webhook.request_timeout_seconds, 10);
        assert_eq!(
            config.dispatcher_sources().unwrap().resolve(),
            Ok("http://dispatcher:9000".to_string())
        );
    }

    #[test]
    fn test_legacy_json_source() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_path = dir.path().join("config.json");
        std::fs::write(
            &legacy_path,
            r#"{"dispatcherUrl": "http://legacy:8080", "recordingDirectory": "/tmp"}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.analysis.dispatcher = Some("http://dispatcher:9000".into());
        config.legacy.config_path = Some(legacy_path);

        assert_eq!(
            config.dispatcher_sources().unwrap().resolve(),
            Ok("http://legacy:8080".to_string())
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.webhook.subscribers.push("http://a".into());
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.webhook.subscribers, vec!["http://a"]);
    }
}
