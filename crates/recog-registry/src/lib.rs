//! Recog Registry
//!
//! Model-serving registry for image-classification inference.
//!
//! The registry loads trained models from a directory layout, keeps them ready
//! for concurrent inference, creates new models through an external trainer,
//! and ranks raw scores into labelled predictions:
//! - [`ModelRegistry`]: the catalog, its lifecycle operations and leased inference
//! - [`InferenceEngine`]: seam for the engine that loads and runs model artifacts
//! - [`Trainer`]: seam for the service that trains new models ([`HttpTrainer`])
//! - [`ranker`]: binary and top-k multi-class label ranking

pub mod config;
pub mod engine;
pub mod loader;
pub mod model_config;
pub mod ranker;
pub mod record;
pub mod registry;
pub mod trainer;

pub use config::{DefaultModelConfig, RegistryConfig};
pub use engine::{EngineModel, InferenceEngine, RunRequest};
pub use loader::LoadedModel;
pub use model_config::ModelConfig;
pub use record::{ModelLease, ModelRecord, ModelStatus};
pub use registry::{ModelInfo, ModelRegistry, RegistryBuilder};
pub use trainer::{CreateRequest, HttpTrainer, Trainer, TrainerResponse};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{EngineModel, InferenceEngine, RunRequest};
    pub use crate::registry::{ModelInfo, ModelRegistry, RegistryBuilder};
    pub use crate::trainer::{CreateRequest, Trainer, TrainerResponse};
    pub use recog_core::{ClassificationKind, Error, ImageFormat, InferLabel, Result};
}
