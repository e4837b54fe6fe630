use super::types::GlobalConfig;
use crate::classifier::rules;
use crate::wordlists::SizeTier;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "credsweep.yaml";

const DEFAULT_CONFIG_PATHS: &[&str] = &["./credsweep.yaml", "./config/credsweep.yaml"];

const SYSTEM_CONFIG_PATH: &str = "/etc/credsweep/credsweep.yaml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with an optional explicit path
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        // an explicit path must exist
        if let Some(path) = custom_path {
            return Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from custom path: {:?}", path));
        }

        for path in Self::search_paths() {
            if path.exists() {
                let config = Self::load_from_file(&path)?;
                tracing::info!("Loaded configuration from: {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect();
        if let Some(dirs) = ProjectDirs::from("", "", "credsweep") {
            paths.push(dirs.config_dir().join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
        paths
    }

    pub fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = if content.trim().is_empty() {
            GlobalConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {:?}", path))?
        };

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate_config(config: &GlobalConfig) -> Result<()> {
        if config.engine.progress_interval_ms == 0 {
            anyhow::bail!("engine.progress_interval_ms must be greater than 0");
        }
        if config.engine.progress_queue == 0 {
            anyhow::bail!("engine.progress_queue must be greater than 0");
        }
        if config.http.timeout_s == 0 {
            anyhow::bail!("http.timeout_s must be greater than 0");
        }
        if config.discovery.render_timeout_s == 0 {
            anyhow::bail!("discovery.render_timeout_s must be greater than 0");
        }

        if config.classifier.rules.is_empty() {
            anyhow::bail!("classifier.rules cannot be empty");
        }
        for name in &config.classifier.rules {
            if rules::by_name(name).is_none() {
                anyhow::bail!("classifier.rules: unknown rule '{}'", name);
            }
        }

        for (key, tier) in [
            ("wordlists.web_tier", &config.wordlists.web_tier),
            ("wordlists.archive_tier", &config.wordlists.archive_tier),
        ] {
            tier.parse::<SizeTier>()
                .map_err(|e| anyhow::anyhow!("{}: {}", key, e))?;
        }

        if let Some(remote) = &config.wordlists.remote {
            if remote.timeout_s == 0 {
                anyhow::bail!("wordlists.remote.timeout_s must be greater than 0");
            }
        }

        Ok(())
    }
}
