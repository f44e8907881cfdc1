//! ONNX Runtime engine

use super::{Backend, Engine, Executor};
use crate::config::VisionConfig;
use crate::error::EngineError;
use crate::tensor::Tensor;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Tensor as OrtTensor;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OnnxOptions {
    pub device_id: i32,
    /// 0 keeps the runtime default
    pub intra_threads: usize,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            device_id: 0,
            intra_threads: 0,
        }
    }
}

impl From<&VisionConfig> for OnnxOptions {
    fn from(config: &VisionConfig) -> Self {
        Self {
            device_id: config.accelerator_device_id,
            intra_threads: config.intra_threads,
        }
    }
}

/// Engine backed by ONNX Runtime: CUDA for [`Backend::Accelerated`], CPU for
/// [`Backend::Fallback`].
#[derive(Debug, Clone, Default)]
pub struct OnnxEngine {
    options: OnnxOptions,
}

impl OnnxEngine {
    pub fn new(options: OnnxOptions) -> Self {
        Self { options }
    }

    fn builder(&self, backend: Backend) -> Result<SessionBuilder, ort::Error> {
        let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
        if self.options.intra_threads > 0 {
            builder = builder.with_intra_threads(self.options.intra_threads)?;
        }

        let builder = match backend {
            // error_on_failure: a missing GPU must fail here so the session can fall back
            Backend::Accelerated => builder.with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(self.options.device_id)
                .build()
                .error_on_failure()])?,
            Backend::Fallback => builder.with_execution_providers([CPUExecutionProvider::default().build()])?,
        };
        Ok(builder)
    }
}

fn engine_error(context: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::new(format!("{}: {}", context, e))
}

impl Engine for OnnxEngine {
    fn initialize(&self, backend: Backend, model: &[u8]) -> Result<Box<dyn Executor>, EngineError> {
        let session = self
            .builder(backend)
            .map_err(|e| engine_error("failed to configure session", e))?
            .commit_from_memory(model)
            .map_err(|e| engine_error("failed to load model", e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| EngineError::new("model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| EngineError::new("model has no outputs"))?;

        info!(
            "ONNX session committed on {} backend (input {:?}, output {:?})",
            backend, input_name, output_name
        );

        Ok(Box::new(OnnxExecutor {
            session,
            input_name,
            output_name,
        }))
    }
}

struct OnnxExecutor {
    session: Session,
    input_name: String,
    output_name: String,
}

impl Executor for OnnxExecutor {
    fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, EngineError> {
        let value = OrtTensor::from_array((input.shape().to_vec(), input.data().to_vec()))
            .map_err(|e| engine_error("failed to create input tensor", e))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => value])
            .map_err(|e| engine_error("inference failed", e))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| EngineError::new(format!("missing output {:?}", self.output_name)))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| engine_error("output is not f32", e))?;

        let shape = shape
            .iter()
            .map(|&d| usize::try_from(d).map_err(|_| EngineError::new(format!("dynamic output dim {}", d))))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("ONNX output shape {:?}", shape);

        Tensor::new(shape, data.to_vec()).map_err(|e| engine_error("malformed output", e))
    }
}
