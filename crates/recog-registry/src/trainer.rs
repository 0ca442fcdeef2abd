//! Trainer service client used to create new models

use async_trait::async_trait;
use recog_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Epoch count sent with every creation request
pub const TRAINING_EPOCHS: u32 = 1;

/// Trainer's reply, handed back verbatim to the caller of `create`
pub type TrainerResponse = serde_json::Map<String, serde_json::Value>;

/// Model-creation request sent to the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Image label for this model
    pub subject: String,

    /// Directory the trainer populates
    #[serde(rename = "modelPath")]
    pub model_path: String,

    /// Where the trainer is expected to write the model configuration
    #[serde(rename = "configFile")]
    pub config_file: String,

    #[serde(rename = "desc")]
    pub description: String,

    pub epochs: u32,

    /// Quick trial run instead of full training
    pub trial: bool,
}

impl CreateRequest {
    pub fn new(
        subject: impl Into<String>,
        model_path: &Path,
        config_file: &Path,
        description: impl Into<String>,
        trial: bool,
    ) -> Self {
        Self {
            subject: subject.into(),
            model_path: model_path.to_string_lossy().into_owned(),
            config_file: config_file.to_string_lossy().into_owned(),
            description: description.into(),
            epochs: TRAINING_EPOCHS,
            trial,
        }
    }
}

/// External process that trains and writes a new model directory
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Train model `name` and wait for the result
    async fn create(&self, name: &str, request: &CreateRequest) -> Result<TrainerResponse>;
}

/// Trainer reached over HTTP: `POST http://{host}/model/{name}`
#[derive(Debug, Clone)]
pub struct HttpTrainer {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpTrainer {
    /// Create a client for the trainer at `host` (`host:port` or a full URL)
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build trainer client: {}", e)))?;
        Self::with_client(host, client)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(host: impl AsRef<str>, client: reqwest::Client) -> Result<Self> {
        let host = host.as_ref().trim_end_matches('/');
        let raw = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };

        let base_url = reqwest::Url::parse(&raw)
            .map_err(|e| Error::config(format!("invalid trainer host '{}': {}", host, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!("invalid trainer host '{}'", host)));
        }

        Ok(Self { client, base_url })
    }

    /// Endpoint that creates model `name`; the name is percent-encoded as a
    /// single path segment
    pub fn endpoint(&self, name: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        // Never fails: `with_client` rejects cannot-be-a-base URLs.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("model").push(name);
        }
        url
    }
}

#[async_trait]
impl Trainer for HttpTrainer {
    async fn create(&self, name: &str, request: &CreateRequest) -> Result<TrainerResponse> {
        let url = self.endpoint(name);
        debug!(model = %name, url = %url, trial = request.trial, "sending creation request");

        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::create(format!("trainer request to {} failed: {}", url, e)))?;

        response
            .json::<TrainerResponse>()
            .await
            .map_err(|e| Error::create(format!("invalid trainer response from {}: {}", url, e)))
    }
}
