//! Registry configuration

use recog_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `models_path`
pub const ENV_MODELS_PATH: &str = "RECOG_MODELS_PATH";
/// Environment variable overriding `user_model_path`
pub const ENV_USER_MODEL_PATH: &str = "RECOG_USER_MODEL_PATH";
/// Environment variable overriding `trainer_host`
pub const ENV_TRAINER_HOST: &str = "RECOG_TRAINER_HOST";

/// Configuration for a model registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory whose subdirectories are model directories
    #[serde(default = "default_models_path")]
    pub models_path: PathBuf,

    /// Extra model directory loaded alongside the scanned ones
    #[serde(default)]
    pub user_model_path: Option<PathBuf>,

    /// `host:port` of the trainer service; creation is disabled when unset
    #[serde(default)]
    pub trainer_host: Option<String>,

    /// Model synthesized when no model loads at startup
    #[serde(default)]
    pub default_model: DefaultModelConfig,
}

impl RegistryConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid registry config: {}", e)))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a file if it exists, or use defaults.
    /// Environment overrides are applied either way.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `RECOG_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_MODELS_PATH) {
            self.models_path = PathBuf::from(path);
        }

        if let Some(path) = lookup(ENV_USER_MODEL_PATH) {
            self.user_model_path = Some(PathBuf::from(path)).filter(|p| !p.as_os_str().is_empty());
        }

        if let Some(host) = lookup(ENV_TRAINER_HOST) {
            self.trainer_host = Some(host).filter(|h| !h.is_empty());
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            models_path: default_models_path(),
            user_model_path: None,
            trainer_host: None,
            default_model: DefaultModelConfig::default(),
        }
    }
}

/// Parameters of the fallback model created on an empty catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default = "default_model_description")]
    pub description: String,
}

impl Default for DefaultModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            subject: String::new(),
            description: default_model_description(),
        }
    }
}

fn default_models_path() -> PathBuf {
    PathBuf::from("./models")
}

fn default_model_name() -> String {
    "default".to_string()
}

fn default_model_description() -> String {
    "Default Model".to_string()
}
