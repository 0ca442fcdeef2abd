//! Error types for recog

/// Result type alias using recog's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for registry and inference operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown model name
    #[error("no such model: {0}")]
    NotFound(String),

    /// Duplicate model name or storage path on registration
    #[error("conflict: {0}")]
    Conflict(String),

    /// Model is leased by in-flight requests
    #[error("currently in use: {name} ({ref_count})")]
    Busy { name: String, ref_count: u32 },

    /// Model exists but has not finished loading
    #[error("model not ready yet: {0}")]
    NotReady(String),

    /// Bad configuration, engine load failure, or missing/corrupt labels file
    #[error("load failure: {0}")]
    LoadFailure(String),

    /// Trainer transport/decode error or post-creation load failure
    #[error("create failure: {0}")]
    CreateFailure(String),

    /// Unknown image encoding
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Configuration declares neither binary nor multi classification
    #[error("unknown classification: {0}")]
    UnsupportedClassification(String),

    /// Engine run failure or malformed score vector
    #[error("inference error: {0}")]
    Inference(String),

    /// Registry configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new busy error
    pub fn busy(name: impl Into<String>, ref_count: u32) -> Self {
        Self::Busy {
            name: name.into(),
            ref_count,
        }
    }

    /// Create a new not-ready error
    pub fn not_ready(name: impl Into<String>) -> Self {
        Self::NotReady(name.into())
    }

    /// Create a new load failure
    pub fn load(msg: impl Into<String>) -> Self {
        Self::LoadFailure(msg.into())
    }

    /// Create a new create failure
    pub fn create(msg: impl Into<String>) -> Self {
        Self::CreateFailure(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable tag for this error's category, suitable for mapping to
    /// transport-level status codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Busy { .. } => "busy",
            Self::NotReady(_) => "not_ready",
            Self::LoadFailure(_) => "load_failure",
            Self::CreateFailure(_) => "create_failure",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::UnsupportedClassification(_) => "unsupported_classification",
            Self::Inference(_) => "inference",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
