//! Extension points for the external inference engine.

use async_trait::async_trait;
use recog_core::{ImageFormat, Result};
use std::path::Path;

/// Pluggable backend that turns model directories into runnable handles.
///
/// Implement this trait in external crates to provide the actual numeric
/// work (TensorFlow, ONNX, Candle, ...) without coupling the registry to a
/// heavyweight runtime.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Load the artifact in `path`, selecting the graph declared by `tags`.
    async fn load_model(&self, path: &Path, tags: &[String]) -> Result<Box<dyn EngineModel>>;
}

/// A loaded, runnable model owned by exactly one registry record.
///
/// Dropping the handle releases the engine's resources.
#[async_trait]
pub trait EngineModel: Send + Sync {
    /// Run the model on an encoded image and return raw scores.
    ///
    /// Preprocessing is entirely the engine's job. The reference pipeline
    /// decodes to three channels, resizes bilinearly to `input_shape`,
    /// subtracts a mean of 117 and scales by 1.
    async fn run(&self, request: RunRequest<'_>) -> Result<Vec<f32>>;
}

/// Everything an engine needs to execute one inference
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Encoded image bytes
    pub image: &'a [u8],

    pub format: ImageFormat,

    /// Graph endpoint fed with the preprocessed image
    pub input_operation: &'a str,

    /// Graph endpoint producing the scores
    pub output_operation: &'a str,

    /// Spatial input shape (height, width)
    pub input_shape: [i32; 2],
}
