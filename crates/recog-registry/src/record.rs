//! Catalog records and usage leases

use crate::loader::LoadedModel;
use recog_core::{Error, Result};
use serde::Serialize;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Lifecycle status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelStatus {
    /// Slot reserved, model not yet servable
    #[serde(rename = "ready")]
    Ready,
    /// Fully loaded and servable
    #[serde(rename = "run")]
    Running,
}

impl ModelStatus {
    /// Label reported by `describe`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "run",
        }
    }
}

/// One entry of the model catalog
#[derive(Debug)]
pub struct ModelRecord {
    name: String,
    storage_path: PathBuf,
    ref_count: AtomicU32,
    loaded: OnceLock<LoadedModel>,
}

impl ModelRecord {
    /// Reserve a slot for a model that has not been loaded yet
    pub fn placeholder(name: impl Into<String>, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            storage_path: storage_path.into(),
            ref_count: AtomicU32::new(0),
            loaded: OnceLock::new(),
        }
    }

    /// Build a servable record named after the loaded configuration
    pub fn from_loaded(storage_path: impl Into<PathBuf>, loaded: LoadedModel) -> Self {
        let record = Self::placeholder(loaded.config().name.clone(), storage_path);
        // Fresh OnceLock, cannot already be set.
        let _ = record.loaded.set(loaded);
        record
    }

    /// Install the loaded model, flipping the status to `Running`.
    ///
    /// The loaded part becomes visible all at once; a second call fails.
    pub fn complete(&self, loaded: LoadedModel) -> Result<()> {
        if loaded.config().name != self.name {
            return Err(Error::load(format!(
                "model name '{}' does not match configuration '{}'",
                self.name,
                loaded.config().name
            )));
        }

        self.loaded
            .set(loaded)
            .map_err(|_| Error::internal(format!("model '{}' is already loaded", self.name)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Number of outstanding leases
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ModelStatus {
        if self.loaded.get().is_some() {
            ModelStatus::Running
        } else {
            ModelStatus::Ready
        }
    }

    /// Loaded model, present once the record is `Running`
    pub fn loaded(&self) -> Option<&LoadedModel> {
        self.loaded.get()
    }
}

/// A claim on a record that keeps it from being deleted.
///
/// Acquiring increments the record's reference count and dropping the lease
/// decrements it, so every lease is released exactly once.
#[derive(Debug)]
pub struct ModelLease {
    record: Arc<ModelRecord>,
}

impl ModelLease {
    pub(crate) fn acquire(record: Arc<ModelRecord>) -> Self {
        record.ref_count.fetch_add(1, Ordering::SeqCst);
        Self { record }
    }

    /// Release the lease explicitly
    pub fn release(self) {}

    /// Shared handle to the leased record
    pub fn record(&self) -> &Arc<ModelRecord> {
        &self.record
    }
}

impl Deref for ModelLease {
    type Target = ModelRecord;

    fn deref(&self) -> &ModelRecord {
        &self.record
    }
}

impl Drop for ModelLease {
    fn drop(&mut self) {
        self.record.ref_count.fetch_sub(1, Ordering::SeqCst);
    }
}
