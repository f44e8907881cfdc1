//! Inference worker
//!
//! A single tokio task owns the [`InferenceSession`] and the [`FrameScheduler`].
//! Producers talk to it through a [`WorkerHandle`] using the messages in
//! [`protocol`]. Model execution runs on the blocking pool; the session is
//! moved into the blocking job and handed back with the result, so it is never
//! shared.
//!
//! Both channels are bounded. A frame is only admitted once a slot in the
//! response channel has been reserved for its answer; while the producer is
//! not draining responses, new frames are shed instead.

pub mod protocol;

pub use protocol::{WorkerRequest, WorkerResponse};

use crate::backend::{Backend, Engine};
use crate::config::VisionConfig;
use crate::error::{InferenceError, VisionError};
use crate::frame::Frame;
use crate::models::ModelFetcher;
use crate::processing::{DetectionPipeline, FrameResult};
use crate::scheduler::{Admission, FrameScheduler, SchedulerStats};
use crate::session::InferenceSession;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

type JobOutput = (InferenceSession, Result<FrameResult, VisionError>);

/// Resolves when the in-flight job finishes; never resolves when idle
async fn join_in_flight(slot: &mut Option<JoinHandle<JobOutput>>) -> Result<JobOutput, JoinError> {
    match slot.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn check_input_size(input_size: u32) -> Result<(), VisionError> {
    if input_size == 0 || input_size > VisionConfig::MAX_INPUT_SIZE {
        return Err(VisionError::Config(format!(
            "Input size {} is outside 1..={}",
            input_size,
            VisionConfig::MAX_INPUT_SIZE
        )));
    }
    Ok(())
}

pub struct InferenceWorker {
    pipeline: DetectionPipeline,
    engine: Arc<dyn Engine>,
    fetcher: ModelFetcher,
    model: Option<Arc<[u8]>>,
    session: Option<InferenceSession>,
    scheduler: FrameScheduler,
    stats: Arc<Mutex<SchedulerStats>>,
    input_size: u32,
    responses: mpsc::Sender<WorkerResponse>,
    // answer slot held by the in-flight frame
    reserved: Option<mpsc::OwnedPermit<WorkerResponse>>,
}

impl InferenceWorker {
    /// Validate `config` and start the worker task on the current runtime
    pub fn spawn(config: VisionConfig, engine: Arc<dyn Engine>) -> Result<WorkerHandle, VisionError> {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::channel(config.request_buffer);
        let (response_tx, response_rx) = mpsc::channel(config.response_buffer);
        let stats = Arc::new(Mutex::new(SchedulerStats::default()));

        let worker = InferenceWorker {
            fetcher: ModelFetcher::new(config.cache_dir.clone()),
            input_size: config.input_size,
            pipeline: DetectionPipeline::new(Arc::new(config)),
            engine,
            model: None,
            session: None,
            scheduler: FrameScheduler::new(),
            stats: stats.clone(),
            responses: response_tx,
            reserved: None,
        };
        let task = tokio::spawn(worker.run(request_rx));

        Ok(WorkerHandle {
            requests: request_tx,
            responses: response_rx,
            stats,
            task: Some(task),
        })
    }

    async fn run(mut self, mut requests: mpsc::Receiver<WorkerRequest>) {
        info!("Inference worker started");
        let mut in_flight: Option<JoinHandle<JobOutput>> = None;
        let mut stopping = false;

        loop {
            if stopping && in_flight.is_none() {
                break;
            }

            tokio::select! {
                joined = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    self.finish(joined);
                }
                request = requests.recv(), if !stopping => match request {
                    Some(WorkerRequest::Init { input_size }) => {
                        // answer the in-flight frame before touching the session
                        if let Some(job) = in_flight.take() {
                            let joined = job.await;
                            self.finish(joined);
                        }
                        let response = match self.initialize(input_size).await {
                            Ok(backend) => WorkerResponse::Ready { backend },
                            Err(e) => {
                                error!("Session initialization failed: {}", e);
                                WorkerResponse::error(e)
                            }
                        };
                        self.respond(response).await;
                    }
                    Some(WorkerRequest::Infer { frame, input_size, emit_labels }) => {
                        if let Some(job) = self.admit(frame, input_size, emit_labels).await {
                            in_flight = Some(job);
                        }
                    }
                    Some(WorkerRequest::Stop) => {
                        info!("Stop requested, draining in-flight frame");
                        stopping = true;
                    }
                    None => {
                        debug!("Request channel closed, draining in-flight frame");
                        stopping = true;
                    }
                },
            }
        }

        self.respond(WorkerResponse::Stopped).await;
        info!("Inference worker stopped");
    }

    /// Fetch the model (once) and bring up a fresh session
    async fn initialize(&mut self, input_size: u32) -> Result<Backend, VisionError> {
        check_input_size(input_size)?;
        self.input_size = input_size;
        self.session = None;

        let model = match &self.model {
            Some(model) => model.clone(),
            None => {
                let config = self.pipeline.config();
                let bytes = self
                    .fetcher
                    .fetch(&config.model, config.model_checksum.as_deref())
                    .await?;
                info!("Model fetched from {} ({} bytes)", config.model, bytes.len());
                let model: Arc<[u8]> = bytes.into();
                self.model = Some(model.clone());
                model
            }
        };

        let engine = self.engine.clone();
        let (session, loaded) = tokio::task::spawn_blocking(move || {
            let mut session = InferenceSession::new(engine);
            let loaded = session.load(&model);
            (session, loaded)
        })
        .await
        .map_err(|e| VisionError::Worker(format!("Session load aborted: {}", e)))?;

        let backend = loaded?;
        info!("Session ready on {} backend, input size {}", backend, input_size);
        self.session = Some(session);
        Ok(backend)
    }

    /// Apply the admission policy and start a blocking job for an admitted frame
    async fn admit(&mut self, frame: Frame, input_size: u32, emit_labels: bool) -> Option<JoinHandle<JobOutput>> {
        if self.scheduler.is_busy() {
            self.scheduler.submit(frame.frame_id());
            self.publish_stats();
            return None;
        }

        if let Err(e) = check_input_size(input_size) {
            self.notify(WorkerResponse::error(e));
            return None;
        }

        if !self.session.as_ref().is_some_and(InferenceSession::is_ready) {
            debug!("Session not ready, initializing before frame {}", frame.frame_id());
            if let Err(e) = self.initialize(self.input_size).await {
                error!("Implicit session initialization failed: {}", e);
                self.notify(WorkerResponse::error(e));
                return None;
            }
        }

        let reserved = match self.responses.clone().try_reserve_owned() {
            Ok(permit) => Some(permit),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.scheduler.shed(frame.frame_id());
                self.publish_stats();
                return None;
            }
            // nobody is listening; the frame still runs
            Err(mpsc::error::TrySendError::Closed(_)) => None,
        };

        let admission = self.scheduler.submit(frame.frame_id());
        self.publish_stats();
        if admission != Admission::Admitted {
            return None;
        }
        self.reserved = reserved;

        let Some(mut session) = self.session.take() else {
            self.scheduler.complete();
            self.publish_stats();
            self.reply(WorkerResponse::error(InferenceError::NotReady));
            return None;
        };
        let pipeline = self.pipeline.clone();
        Some(tokio::task::spawn_blocking(move || {
            let result = pipeline.process(&mut session, &frame, input_size, emit_labels);
            (session, result)
        }))
    }

    /// Hand back the session, answer the frame and release the scheduler
    fn finish(&mut self, joined: Result<JobOutput, JoinError>) {
        let response = match joined {
            Ok((session, result)) => {
                self.session = Some(session);
                match result {
                    Ok(result) => WorkerResponse::from(result),
                    Err(e) => {
                        error!("Frame processing error: {}", e);
                        WorkerResponse::error(e)
                    }
                }
            }
            Err(e) => {
                // the session went down with the job
                warn!("Inference job aborted, session discarded: {}", e);
                WorkerResponse::error(VisionError::Worker(format!("Inference job aborted: {}", e)))
            }
        };
        self.scheduler.complete();
        self.publish_stats();
        self.reply(response);
    }

    fn publish_stats(&self) {
        *self.stats.lock() = self.scheduler.stats();
    }

    /// Answer the admitted frame through its reserved slot
    fn reply(&mut self, response: WorkerResponse) {
        match self.reserved.take() {
            Some(permit) => {
                permit.send(response);
            }
            None => self.notify(response),
        }
    }

    /// Send without waiting; dropped if the producer is not draining
    fn notify(&self, response: WorkerResponse) {
        match self.responses.try_send(response) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(response)) => {
                warn!("Response backlog full, dropping {:?}", response);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => debug!("Response receiver dropped"),
        }
    }

    /// Send, waiting for the producer to make room
    async fn respond(&mut self, response: WorkerResponse) {
        if self.responses.send(response).await.is_err() {
            debug!("Response receiver dropped");
        }
    }
}

/// Producer side of the worker channel
#[derive(Debug)]
pub struct WorkerHandle {
    requests: mpsc::Sender<WorkerRequest>,
    responses: mpsc::Receiver<WorkerResponse>,
    stats: Arc<Mutex<SchedulerStats>>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Queue a request, waiting for buffer space
    pub async fn send(&self, request: WorkerRequest) -> Result<(), VisionError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| VisionError::ChannelClosed)
    }

    /// Offer a frame without waiting.
    ///
    /// Returns `Ok(false)` when the request buffer is full and the frame was
    /// dropped at the boundary.
    pub fn try_submit(&self, frame: Frame, input_size: u32, emit_labels: bool) -> Result<bool, VisionError> {
        match self.requests.try_send(WorkerRequest::Infer {
            frame,
            input_size,
            emit_labels,
        }) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(VisionError::ChannelClosed),
        }
    }

    /// Next response, or `None` once the worker has exited.
    ///
    /// The response channel holds `response_buffer` answers. Until the caller
    /// drains it, new frames are dropped as backlog and `Init` waits.
    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.responses.recv().await
    }

    /// Snapshot of the worker's admission counters
    pub fn stats(&self) -> SchedulerStats {
        *self.stats.lock()
    }

    /// Stop the worker, draining responses until it reports `Stopped`.
    ///
    /// Responses still in the channel are returned in order, the in-flight
    /// frame's answer included.
    pub async fn shutdown(mut self) -> Result<Vec<WorkerResponse>, VisionError> {
        let mut drained = Vec::new();
        {
            // keep draining while Stop waits for request space
            let stop = self.requests.send(WorkerRequest::Stop);
            tokio::pin!(stop);
            let mut stop_queued = false;
            loop {
                tokio::select! {
                    // a closed channel means the worker is already stopping
                    _ = &mut stop, if !stop_queued => stop_queued = true,
                    response = self.responses.recv() => match response {
                        Some(WorkerResponse::Stopped) | None => break,
                        Some(response) => drained.push(response),
                    },
                }
            }
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| VisionError::Worker(format!("Worker task failed: {}", e)))?;
        }
        Ok(drained)
    }
}
