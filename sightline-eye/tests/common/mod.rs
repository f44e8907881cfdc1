//! Shared fixtures for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use sightline_eye::{Backend, Engine, EngineError, Executor, ModelSource, Tensor, VisionConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Default config with an in-memory model and no download cache
pub fn test_config() -> VisionConfig {
    VisionConfig {
        model: ModelSource::Memory(b"fake-model".to_vec()),
        cache_dir: None,
        ..VisionConfig::default()
    }
}

/// Releases a blocked executor one run at a time
pub struct Gate {
    release: std_mpsc::Sender<()>,
    started: mpsc::UnboundedReceiver<()>,
}

impl Gate {
    /// Wait until the executor has picked up a frame
    pub async fn started(&mut self) {
        tokio::time::timeout(WAIT, self.started.recv())
            .await
            .expect("executor never started")
            .expect("engine dropped");
    }

    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

struct GateInner {
    release: Mutex<std_mpsc::Receiver<()>>,
    started: mpsc::UnboundedSender<()>,
}

/// Engine returning fixed `[x, y, w, h, confidence, class]` rows
#[derive(Clone, Default)]
pub struct FakeEngine {
    accelerated_error: Option<String>,
    fallback_error: Option<String>,
    rows: Vec<[f32; 6]>,
    run_error: Option<String>,
    gate: Option<Arc<GateInner>>,
    panic_next: Arc<AtomicBool>,
    pub inits: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<[f32; 6]>) -> Self {
        self.rows = rows;
        self
    }

    pub fn without_accelerator(mut self, message: &str) -> Self {
        self.accelerated_error = Some(message.to_string());
        self
    }

    pub fn broken(mut self, accelerated: &str, fallback: &str) -> Self {
        self.accelerated_error = Some(accelerated.to_string());
        self.fallback_error = Some(fallback.to_string());
        self
    }

    pub fn failing_runs(mut self, message: &str) -> Self {
        self.run_error = Some(message.to_string());
        self
    }

    /// Block every run until the returned gate releases it
    pub fn gated(mut self) -> (Self, Gate) {
        let (release_tx, release_rx) = std_mpsc::channel();
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        self.gate = Some(Arc::new(GateInner {
            release: Mutex::new(release_rx),
            started: started_tx,
        }));
        (
            self,
            Gate {
                release: release_tx,
                started: started_rx,
            },
        )
    }

    /// The next run panics instead of returning
    pub fn panic_on_next_run(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Engine for FakeEngine {
    fn initialize(&self, backend: Backend, model: &[u8]) -> Result<Box<dyn Executor>, EngineError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if model.is_empty() {
            return Err(EngineError::new("empty model"));
        }
        let error = match backend {
            Backend::Accelerated => &self.accelerated_error,
            Backend::Fallback => &self.fallback_error,
        };
        if let Some(message) = error {
            return Err(EngineError::new(message.clone()));
        }
        Ok(Box::new(FakeExecutor {
            engine: self.clone(),
        }))
    }
}

struct FakeExecutor {
    engine: FakeEngine,
}

impl Executor for FakeExecutor {
    fn run(&mut self, _input: &Tensor<f32>) -> Result<Tensor<f32>, EngineError> {
        self.engine.runs.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.engine.gate {
            let _ = gate.started.send(());
            let _ = gate.release.lock().recv_timeout(WAIT);
        }
        if self.engine.panic_next.swap(false, Ordering::SeqCst) {
            panic!("executor crashed");
        }
        if let Some(message) = &self.engine.run_error {
            return Err(EngineError::new(message.clone()));
        }

        let data: Vec<f32> = self.engine.rows.iter().flatten().copied().collect();
        Tensor::new(vec![1, self.engine.rows.len(), 6], data).map_err(|e| EngineError::new(e.to_string()))
    }
}

/// Next response from the worker, failing the test on timeout or exit
pub async fn next_response(handle: &mut sightline_eye::WorkerHandle) -> sightline_eye::WorkerResponse {
    tokio::time::timeout(WAIT, handle.recv())
        .await
        .expect("timed out waiting for worker response")
        .expect("worker exited")
}

/// Poll the shared stats until `condition` holds
pub async fn wait_for_stats<F>(handle: &sightline_eye::WorkerHandle, condition: F)
where
    F: Fn(&sightline_eye::SchedulerStats) -> bool,
{
    tokio::time::timeout(WAIT, async {
        while !condition(&handle.stats()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler stats never reached the expected state");
}
