//! Model registry initialization and management
//!
//! The registry owns the catalog of loaded models. Structural changes
//! (insert, remove) take the catalog's write lock; lookups and leases take
//! the read lock. Each record carries an atomic reference count that is only
//! touched through [`ModelLease`], so inference and trainer round-trips run
//! without holding the catalog lock while still keeping their record alive.

use crate::config::RegistryConfig;
use crate::engine::{InferenceEngine, RunRequest};
use crate::loader::{discover_model_dirs, LoadedModel};
use crate::model_config::CONFIG_FILE_NAME;
use crate::ranker;
use crate::record::{ModelLease, ModelRecord, ModelStatus};
use crate::trainer::{CreateRequest, HttpTrainer, Trainer, TrainerResponse};
use recog_core::{Error, ImageFormat, InferLabel, Result};
use recog_telemetry::MetricsCollector;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

type Catalog = HashMap<String, Arc<ModelRecord>>;

/// Concurrency-safe catalog of image-classification models
pub struct ModelRegistry {
    models: RwLock<Catalog>,
    config: RegistryConfig,
    engine: Arc<dyn InferenceEngine>,
    trainer: Option<Arc<dyn Trainer>>,
    metrics: MetricsCollector,
}

impl ModelRegistry {
    /// Create an empty registry. Call [`initialize`](Self::initialize) to
    /// populate it, or use [`RegistryBuilder`] which does both.
    pub fn new(
        config: RegistryConfig,
        engine: Arc<dyn InferenceEngine>,
        trainer: Option<Arc<dyn Trainer>>,
    ) -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            config,
            engine,
            trainer,
            metrics: MetricsCollector::new(),
        }
    }

    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Scan the models directory and the optional user model directory.
    ///
    /// Candidates that fail to load are logged and skipped; their directories
    /// are left alone. If nothing loads, the configured default model is
    /// created through the trainer, and only that failure is returned.
    pub async fn initialize(&self) -> Result<()> {
        let models_path = self.config.models_path.clone();
        tokio::fs::create_dir_all(&models_path).await.map_err(|e| {
            Error::config(format!(
                "failed to prepare models directory {}: {}",
                models_path.display(),
                e
            ))
        })?;

        info!(path = %models_path.display(), "scanning models directory");
        match discover_model_dirs(&models_path).await {
            Ok(dirs) => {
                for dir in dirs {
                    self.load_and_register(&dir).await;
                }
            }
            Err(e) => warn!(path = %models_path.display(), error = %e, "failed to scan models directory"),
        }

        if let Some(user_path) = self.config.user_model_path.clone() {
            self.load_and_register(&user_path).await;
        }

        if self.model_count().await == 0 {
            let default = &self.config.default_model;
            info!(model = %default.name, "no models loaded, creating default model");

            let response = self
                .create(&default.name, &default.subject, &default.description, false)
                .await?;
            info!(model = %default.name, response = ?response, "created default model");
        }

        let count = self.model_count().await;
        info!(count, "model registry initialized");
        Ok(())
    }

    async fn load_and_register(&self, path: &Path) {
        let record = match self.load(None, path).await {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load model");
                return;
            }
        };

        match self.register(record).await {
            Ok(record) => info!(model = %record.name(), path = %path.display(), "loaded model"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to register model"),
        }
    }

    /// Load the model directory at `path` without touching the catalog.
    ///
    /// When `name` is given it must match the name declared in the
    /// directory's configuration.
    pub async fn load(&self, name: Option<&str>, path: impl AsRef<Path>) -> Result<ModelRecord> {
        let path = path.as_ref();
        let loaded = LoadedModel::load(self.engine.as_ref(), path, name).await?;
        Ok(ModelRecord::from_loaded(path, loaded))
    }

    /// Insert a record, rejecting duplicate names and storage paths
    pub async fn register(&self, record: ModelRecord) -> Result<Arc<ModelRecord>> {
        let record = Arc::new(record);
        let mut models = self.models.write().await;
        insert_locked(&mut models, Arc::clone(&record))?;
        self.metrics.set_models_loaded(models.len());
        Ok(record)
    }

    /// Create a new model through the trainer.
    ///
    /// The slot is reserved and leased before the trainer is contacted, so a
    /// concurrent `create` with the same name fails with `Conflict` and a
    /// concurrent `delete` fails with `Busy`. Any trainer or load failure
    /// removes the slot and its storage again.
    pub async fn create(
        &self,
        name: &str,
        subject: &str,
        description: &str,
        trial: bool,
    ) -> Result<TrainerResponse> {
        let trainer = self
            .trainer
            .as_ref()
            .ok_or_else(|| Error::create("no trainer configured"))?;

        validate_model_name(name)?;

        let storage_path = self
            .config
            .models_path
            .join(format!("{}-{}", name, short_id()));
        let placeholder = Arc::new(ModelRecord::placeholder(name, storage_path.clone()));

        let lease = {
            let mut models = self.models.write().await;
            insert_locked(&mut models, Arc::clone(&placeholder))?;
            self.metrics.set_models_loaded(models.len());
            ModelLease::acquire(Arc::clone(&placeholder))
        };

        let request = CreateRequest::new(
            subject,
            &storage_path,
            &storage_path.join(CONFIG_FILE_NAME),
            description,
            trial,
        );
        info!(model = %name, path = %storage_path.display(), trial, "requesting model creation");

        let response = match trainer.create(name, &request).await {
            Ok(response) => response,
            Err(e) => {
                self.rollback(lease).await;
                return Err(into_create_failure(e));
            }
        };

        let loaded = LoadedModel::load(self.engine.as_ref(), &storage_path, Some(name))
            .await
            .and_then(|loaded| placeholder.complete(loaded));
        if let Err(e) = loaded {
            self.rollback(lease).await;
            return Err(into_create_failure(e));
        }

        lease.release();
        self.metrics.record_create();
        info!(model = %name, "model created");

        Ok(response)
    }

    async fn rollback(&self, lease: ModelLease) {
        let record = Arc::clone(lease.record());

        {
            let mut models = self.models.write().await;
            models.remove(record.name());
            self.metrics.set_models_loaded(models.len());
        }
        lease.release();

        if let Err(e) = remove_storage(record.storage_path()).await {
            warn!(path = %record.storage_path().display(), error = %e, "failed to remove model storage");
        }

        self.metrics.record_create_rollback();
        warn!(model = %record.name(), "rolled back model creation");
    }

    /// Delete an idle model and its storage.
    ///
    /// Fails with `Busy` while any lease is outstanding; it never waits.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut models = self.models.write().await;

        let record = models.get(name).ok_or_else(|| Error::not_found(name))?;
        let ref_count = record.ref_count();
        if ref_count > 0 {
            return Err(Error::busy(name, ref_count));
        }

        remove_storage(record.storage_path()).await?;
        models.remove(name);

        self.metrics.record_delete();
        self.metrics.set_models_loaded(models.len());
        info!(model = %name, "deleted model");

        Ok(())
    }

    /// Take out a lease on a model. The lease is released when dropped.
    pub async fn lease(&self, name: &str) -> Option<ModelLease> {
        let models = self.models.read().await;
        models
            .get(name)
            .map(|record| ModelLease::acquire(Arc::clone(record)))
    }

    /// Snapshot of catalog names, sorted
    pub async fn list_names(&self) -> Vec<String> {
        let models = self.models.read().await;
        let mut names: Vec<String> = models.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read-only projection of one model
    pub async fn describe(&self, name: &str) -> Option<ModelInfo> {
        let models = self.models.read().await;
        models.get(name).map(|record| ModelInfo::from_record(record))
    }

    /// Run inference and rank the result.
    ///
    /// The model is leased for the duration of the call and released on every
    /// path; the engine call itself runs outside the catalog lock.
    pub async fn infer(
        &self,
        name: &str,
        image: &[u8],
        format: &str,
        k: usize,
    ) -> Result<Vec<InferLabel>> {
        let started = Instant::now();
        let result = self.infer_leased(name, image, format, k).await;

        match &result {
            Ok(_) => self
                .metrics
                .record_inference(name, started.elapsed().as_micros() as u64),
            Err(e) => {
                debug!(model = %name, error = %e, "inference failed");
                let model = match e {
                    Error::NotFound(_) => None,
                    _ => Some(name),
                };
                self.metrics.record_inference_error(model, e.kind());
            }
        }

        result
    }

    async fn infer_leased(
        &self,
        name: &str,
        image: &[u8],
        format: &str,
        k: usize,
    ) -> Result<Vec<InferLabel>> {
        let lease = self.lease(name).await.ok_or_else(|| Error::not_found(name))?;
        let loaded = lease.loaded().ok_or_else(|| Error::not_ready(name))?;
        let format: ImageFormat = format.parse()?;
        let config = loaded.config();

        let scores = loaded
            .handle()
            .run(RunRequest {
                image,
                format,
                input_operation: &config.input_operation_name,
                output_operation: &config.output_operation_name,
                input_shape: loaded.input_shape(),
            })
            .await?;

        ranker::rank(config.classification_kind()?, &scores, loaded.labels(), k)
    }

    /// Number of models in the catalog
    pub async fn model_count(&self) -> usize {
        self.models.read().await.len()
    }

    /// Check if a model is registered
    pub async fn contains(&self, name: &str) -> bool {
        self.models.read().await.contains_key(name)
    }

    /// Drop every record, releasing engine handles. Storage is kept.
    ///
    /// Refuses with `Busy` while any model is leased.
    pub async fn shutdown(&self) -> Result<()> {
        let mut models = self.models.write().await;

        if let Some(busy) = models.values().find(|r| r.ref_count() > 0) {
            return Err(Error::busy(busy.name(), busy.ref_count()));
        }

        let count = models.len();
        models.clear();
        self.metrics.set_models_loaded(0);
        info!(count, "model registry shut down");

        Ok(())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Registry activity counters
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

fn insert_locked(models: &mut Catalog, record: Arc<ModelRecord>) -> Result<()> {
    if record.name().is_empty() {
        return Err(Error::conflict("empty model name"));
    }

    if models.contains_key(record.name()) {
        return Err(Error::conflict(format!("duplicated model: {}", record.name())));
    }

    if models
        .values()
        .any(|m| m.storage_path() == record.storage_path())
    {
        return Err(Error::conflict(format!(
            "duplicated model path: {}",
            record.storage_path().display()
        )));
    }

    models.insert(record.name().to_string(), record);
    Ok(())
}

/// Names become a directory under `models_path` and a trainer URL segment,
/// so they must be a single plain path component.
fn validate_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::create("empty model name"));
    }

    let separator_or_control = |c: char| matches!(c, '/' | '\\') || c.is_control();
    if name == "." || name == ".." || name.chars().any(separator_or_control) {
        return Err(Error::create(format!("invalid model name: {:?}", name)));
    }

    Ok(())
}

fn into_create_failure(e: Error) -> Error {
    match e {
        Error::CreateFailure(_) => e,
        other => Error::create(other.to_string()),
    }
}

async fn remove_storage(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Read-only view of a model for `describe`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(rename = "model")]
    pub name: String,

    #[serde(rename = "type")]
    pub model_type: String,

    pub classification: String,

    pub ref_count: u32,

    pub status: ModelStatus,

    #[serde(rename = "inputOperator")]
    pub input_operation: String,

    #[serde(rename = "outputOperator")]
    pub output_operation: String,

    /// Spatial input shape (height, width); empty until loaded
    pub input_shape: Vec<i32>,

    #[serde(rename = "numberOfLabels")]
    pub label_count: usize,

    pub description: String,
}

impl ModelInfo {
    fn from_record(record: &ModelRecord) -> Self {
        let mut info = Self {
            name: record.name().to_string(),
            model_type: String::new(),
            classification: String::new(),
            ref_count: record.ref_count(),
            status: record.status(),
            input_operation: String::new(),
            output_operation: String::new(),
            input_shape: Vec::new(),
            label_count: 0,
            description: String::new(),
        };

        if let Some(loaded) = record.loaded() {
            let config = loaded.config();
            info.model_type = config.model_type.clone();
            info.classification = config.classification.clone();
            info.input_operation = config.input_operation_name.clone();
            info.output_operation = config.output_operation_name.clone();
            info.input_shape = loaded.input_shape().to_vec();
            info.label_count = loaded.labels().len();
            info.description = config.description.clone();
        }

        info
    }
}

/// Builder for a fully initialized [`ModelRegistry`]
pub struct RegistryBuilder {
    config: RegistryConfig,
    engine: Option<Arc<dyn InferenceEngine>>,
    trainer: Option<Arc<dyn Trainer>>,
}

impl RegistryBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::from_config(RegistryConfig::default())
    }

    /// Create a builder from a loaded configuration
    pub fn from_config(config: RegistryConfig) -> Self {
        Self {
            config,
            engine: None,
            trainer: None,
        }
    }

    /// Set the directory scanned for models
    pub fn models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.models_path = path.into();
        self
    }

    /// Set an extra model directory to load
    pub fn user_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.user_model_path = Some(path.into());
        self
    }

    /// Set the inference engine (required)
    pub fn engine(mut self, engine: Arc<dyn InferenceEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the trainer, overriding `trainer_host` from the configuration
    pub fn trainer(mut self, trainer: Arc<dyn Trainer>) -> Self {
        self.trainer = Some(trainer);
        self
    }

    /// Build and initialize the registry
    pub async fn build(self) -> Result<ModelRegistry> {
        let engine = self
            .engine
            .ok_or_else(|| Error::config("no inference engine configured"))?;

        let trainer = match (self.trainer, &self.config.trainer_host) {
            (Some(trainer), _) => Some(trainer),
            (None, Some(host)) => Some(Arc::new(HttpTrainer::new(host)?) as Arc<dyn Trainer>),
            (None, None) => None,
        };

        let registry = ModelRegistry::new(self.config, engine, trainer);
        registry.initialize().await?;

        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
