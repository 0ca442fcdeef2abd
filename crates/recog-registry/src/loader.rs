//! Loading model directories into runnable models

use crate::engine::{EngineModel, InferenceEngine};
use crate::model_config::ModelConfig;
use recog_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fully loaded model: configuration, engine handle and labels
pub struct LoadedModel {
    config: ModelConfig,
    handle: Box<dyn EngineModel>,
    labels: Vec<String>,
    input_shape: [i32; 2],
}

impl LoadedModel {
    /// Load the model directory at `path`.
    ///
    /// Reads `config.yaml`, checks the declared name against `expected_name`
    /// when one is given, asks the engine to load the artifact and finally
    /// reads the labels file (one label per line, line order = output index).
    /// Every failure is a `LoadFailure`.
    pub async fn load(
        engine: &dyn InferenceEngine,
        path: &Path,
        expected_name: Option<&str>,
    ) -> Result<Self> {
        let config = ModelConfig::from_dir(path).await?;

        if config.name.is_empty() {
            return Err(Error::load(format!(
                "model config in {} declares no name",
                path.display()
            )));
        }

        if let Some(expected) = expected_name {
            if expected != config.name {
                return Err(Error::load(format!(
                    "model name '{}' does not match configuration '{}'",
                    expected, config.name
                )));
            }
        }

        let input_shape = config.spatial_shape()?;

        debug!(model = %config.name, path = %path.display(), "loading engine artifact");
        let handle = engine
            .load_model(path, &config.tags)
            .await
            .map_err(|e| match e {
                Error::LoadFailure(_) => e,
                other => Error::load(format!(
                    "engine failed to load {}: {}",
                    path.display(),
                    other
                )),
            })?;

        let labels = read_labels(&path.join(&config.labels_file)).await?;

        Ok(Self {
            config,
            handle,
            labels,
            input_shape,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn handle(&self) -> &dyn EngineModel {
        self.handle.as_ref()
    }

    /// Labels, index-aligned with output scores
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn input_shape(&self) -> [i32; 2] {
        self.input_shape
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("config", &self.config)
            .field("labels", &self.labels.len())
            .field("input_shape", &self.input_shape)
            .finish_non_exhaustive()
    }
}

/// Read a newline-delimited labels file
pub async fn read_labels(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::load(format!("failed to read labels {}: {}", path.display(), e)))?;

    Ok(content.lines().map(str::to_string).collect())
}

/// List candidate model directories directly under `models_dir`.
///
/// Symlinks are followed, so a linked model directory is a candidate too.
/// Dangling links are logged and skipped.
pub async fn discover_model_dirs(models_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(models_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => dirs.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable model entry"),
        }
    }

    dirs.sort();
    Ok(dirs)
}
