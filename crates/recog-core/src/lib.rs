//! Recog Core
//!
//! Core types and error handling shared across recog components.
//!
//! This crate provides:
//! - The error taxonomy returned by every registry operation
//! - Ranked prediction and classification types
//! - Image format tags understood by inference engines

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ClassificationKind, ImageFormat, InferLabel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassificationKind, ImageFormat, InferLabel};
}
