//! Per-model configuration read from a model directory

use recog_core::{ClassificationKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File every model directory carries, written by the trainer for new models
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration for a single model directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name, the catalog key
    #[serde(default)]
    pub name: String,

    /// Free-text architecture/type tag
    #[serde(default, rename = "type")]
    pub model_type: String,

    /// Tags the engine uses to select the graph inside the artifact
    #[serde(default)]
    pub tags: Vec<String>,

    /// `binary` or `multi`
    #[serde(default)]
    pub classification: String,

    /// Input tensor shape; the first two entries are height and width
    #[serde(default)]
    pub input_shape: Vec<i32>,

    /// Graph endpoint fed with the preprocessed image
    #[serde(default)]
    pub input_operation_name: String,

    /// Graph endpoint producing the scores
    #[serde(default)]
    pub output_operation_name: String,

    /// Labels file, relative to the model directory
    #[serde(default)]
    pub labels_file: String,

    #[serde(default)]
    pub description: String,
}

impl ModelConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::load(format!("invalid model config: {}", e)))
    }

    /// Load `config.yaml` from a model directory
    pub async fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::load(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Spatial input shape (height, width) handed to engine preprocessing
    pub fn spatial_shape(&self) -> Result<[i32; 2]> {
        match self.input_shape.as_slice() {
            [h, w, ..] => Ok([*h, *w]),
            _ => Err(Error::load(format!(
                "input_shape of model '{}' needs at least two dimensions, got {:?}",
                self.name, self.input_shape
            ))),
        }
    }

    /// Parsed classification kind
    pub fn classification_kind(&self) -> Result<ClassificationKind> {
        self.classification.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOWERS: &str = r#"
name: flowers
type: inception_v3
tags:
  - serve
classification: multi
input_shape: [299, 299, 3]
input_operation_name: input
output_operation_name: final_result
labels_file: labels.txt
description: "Five flower species"
"#;

    #[test]
    fn test_parse_model_config() {
        let config = ModelConfig::from_yaml(FLOWERS).unwrap();

        assert_eq!(config.name, "flowers");
        assert_eq!(config.model_type, "inception_v3");
        assert_eq!(config.tags, vec!["serve".to_string()]);
        assert_eq!(config.classification_kind().unwrap(), ClassificationKind::Multi);
        assert_eq!(config.spatial_shape().unwrap(), [299, 299]);
        assert_eq!(config.labels_file, "labels.txt");
    }

    #[test]
    fn test_short_input_shape_rejected() {
        let config = ModelConfig {
            name: "tiny".to_string(),
            input_shape: vec![224],
            ..Default::default()
        };

        assert!(matches!(config.spatial_shape(), Err(Error::LoadFailure(_))));
    }

    #[test]
    fn test_unknown_classification_parses_but_is_unsupported() {
        let config = ModelConfig::from_yaml("name: odd\nclassification: regression\n").unwrap();
        assert!(matches!(
            config.classification_kind(),
            Err(Error::UnsupportedClassification(_))
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = ModelConfig::from_yaml("name: [unterminated").unwrap_err();
        assert!(matches!(err, Error::LoadFailure(_)));
    }
}
