//! Mock engine, trainer and model-directory fixtures for registry tests

#![allow(dead_code)]

use async_trait::async_trait;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use recog_core::{Error, Result};
use recog_registry::{CreateRequest, EngineModel, InferenceEngine, RunRequest, Trainer, TrainerResponse};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub const ARTIFACT_FILE: &str = "model.pb";
pub const SCORES_FILE: &str = "scores.txt";

/// On-disk model directory builder
#[derive(Debug, Clone)]
pub struct ModelFixture {
    pub name: String,
    pub classification: String,
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
    pub input_shape: Vec<i32>,
    pub with_labels_file: bool,
    pub with_artifact: bool,
}

impl ModelFixture {
    /// Multi-class model with the given labels and the scores the mock engine will emit
    pub fn multi(name: &str, labels: &[&str], scores: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            classification: "multi".to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            scores: scores.to_vec(),
            input_shape: vec![224, 224, 3],
            with_labels_file: true,
            with_artifact: true,
        }
    }

    /// Binary cat/dog model emitting `prob`
    pub fn binary(name: &str, prob: f32) -> Self {
        Self {
            classification: "binary".to_string(),
            ..Self::multi(name, &["cat", "dog"], &[prob])
        }
    }

    pub fn with_classification(mut self, classification: &str) -> Self {
        self.classification = classification.to_string();
        self
    }

    pub fn without_labels(mut self) -> Self {
        self.with_labels_file = false;
        self
    }

    pub fn without_artifact(mut self) -> Self {
        self.with_artifact = false;
        self
    }

    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Write the model into `dir`, creating it
    pub fn write(&self, dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();

        let shape = self
            .input_shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let config = format!(
            "name: {}\n\
             type: mock\n\
             tags: [serve]\n\
             classification: {}\n\
             input_shape: [{}]\n\
             input_operation_name: input\n\
             output_operation_name: final_result\n\
             labels_file: labels.txt\n\
             description: fixture model {}\n",
            self.name, self.classification, shape, self.name
        );
        std::fs::write(dir.join("config.yaml"), config).unwrap();

        if self.with_labels_file {
            std::fs::write(dir.join("labels.txt"), self.labels.join("\n")).unwrap();
        }

        if self.with_artifact {
            std::fs::write(dir.join(ARTIFACT_FILE), b"graph").unwrap();
        }

        let scores = self
            .scores
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        std::fs::write(dir.join(SCORES_FILE), scores).unwrap();

        dir.to_path_buf()
    }

    /// Write the model into `parent/<name>`
    pub fn write_in(&self, parent: &Path) -> PathBuf {
        self.write(&parent.join(&self.name))
    }
}

/// Two-sided rendezvous used to hold a mock mid-call
pub struct Gate {
    entered: Notify,
    open: Semaphore,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            open: Semaphore::new(0),
        })
    }

    /// Called by the mock: announce arrival, then wait to be let through
    pub async fn pass(&self) {
        self.entered.notify_one();
        let permit = self.open.acquire().await.unwrap();
        permit.forget();
    }

    /// Wait until a mock call has arrived at the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let every waiting (and future) call through
    pub fn open(&self) {
        self.open.add_permits(1024);
    }
}

/// Engine that "loads" any directory holding an artifact file and returns
/// the scores stored next to it
pub struct MockEngine {
    loads: AtomicU32,
    runs: Arc<AtomicU32>,
    fail_runs: bool,
    gate: Option<Arc<Gate>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            loads: AtomicU32::new(0),
            runs: Arc::new(AtomicU32::new(0)),
            fail_runs: false,
            gate: None,
        }
    }

    /// Every inference fails
    pub fn failing_runs(mut self) -> Self {
        self.fail_runs = true;
        self
    }

    /// Every inference blocks on `gate`
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn load_count(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn load_model(&self, path: &Path, tags: &[String]) -> Result<Box<dyn EngineModel>> {
        if !path.join(ARTIFACT_FILE).exists() {
            return Err(Error::load(format!("no artifact in {}", path.display())));
        }
        if tags.is_empty() {
            return Err(Error::load("no tags declared"));
        }

        let raw = std::fs::read_to_string(path.join(SCORES_FILE)).unwrap_or_default();
        let scores = raw
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::load(format!("bad scores: {}", e)))?;

        self.loads.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockModel {
            scores,
            fail: self.fail_runs,
            gate: self.gate.clone(),
            runs: Arc::clone(&self.runs),
        }))
    }
}

struct MockModel {
    scores: Vec<f32>,
    fail: bool,
    gate: Option<Arc<Gate>>,
    runs: Arc<AtomicU32>,
}

#[async_trait]
impl EngineModel for MockModel {
    async fn run(&self, request: RunRequest<'_>) -> Result<Vec<f32>> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        if self.fail {
            return Err(Error::inference("engine exploded"));
        }

        assert_eq!(request.input_operation, "input");
        assert_eq!(request.output_operation, "final_result");
        assert_eq!(request.input_shape, [224, 224]);

        Ok(self.scores.clone())
    }
}

/// What the mock trainer does with a creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerBehavior {
    /// Write a loadable model directory
    Succeed,
    /// Create the directory, then fail as if the connection dropped
    FailTransport,
    /// Write a model directory without a labels file
    WriteBroken,
    /// Write a model whose config declares a different name
    WrongName,
}

/// Trainer that writes fixture model directories
pub struct MockTrainer {
    behavior: TrainerBehavior,
    labels: Vec<String>,
    scores: Vec<f32>,
    gate: Option<Arc<Gate>>,
    requests: Mutex<Vec<(String, CreateRequest)>>,
}

impl MockTrainer {
    pub fn new(behavior: TrainerBehavior) -> Self {
        Self {
            behavior,
            labels: vec!["daisy".into(), "roses".into(), "tulips".into()],
            scores: vec![0.2, 0.5, 0.3],
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(TrainerBehavior::Succeed)
    }

    /// Hold every creation on `gate` before writing anything
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<(String, CreateRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn fixture(&self, name: &str) -> ModelFixture {
        let labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        ModelFixture::multi(name, &labels, &self.scores)
    }
}

#[async_trait]
impl Trainer for MockTrainer {
    async fn create(&self, name: &str, request: &CreateRequest) -> Result<TrainerResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((name.to_string(), request.clone()));

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        let dir = Path::new(&request.model_path);
        match self.behavior {
            TrainerBehavior::Succeed => {
                self.fixture(name).write(dir);
            }
            TrainerBehavior::FailTransport => {
                std::fs::create_dir_all(dir).unwrap();
                return Err(Error::create("connection reset by trainer"));
            }
            TrainerBehavior::WriteBroken => {
                self.fixture(name).without_labels().write(dir);
            }
            TrainerBehavior::WrongName => {
                self.fixture("someone-else").write(dir);
            }
        }

        let mut response = TrainerResponse::new();
        response.insert("model".into(), name.into());
        response.insert("subject".into(), request.subject.clone().into());
        response.insert("accuracy".into(), serde_json::json!(0.93));
        Ok(response)
    }
}

/// Metrics recorder that remembers the labels of every registered series
#[derive(Default)]
pub struct CapturingRecorder {
    series: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl CapturingRecorder {
    fn register(&self, key: &Key) {
        let labels = key
            .labels()
            .map(|l| (l.key().to_string(), l.value().to_string()))
            .collect();
        self.series
            .lock()
            .unwrap()
            .push((key.name().to_string(), labels));
    }

    /// Every value `label` took on series `name`
    pub fn label_values(&self, name: &str, label: &str) -> Vec<String> {
        self.series
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .flat_map(|(_, labels)| labels.iter())
            .filter(|(k, _)| k == label)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl Recorder for CapturingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        self.register(key);
        Counter::noop()
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        self.register(key);
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        self.register(key);
        Histogram::noop()
    }
}

/// Initialize test logging once
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("recog=debug")
        .try_init();
}
