// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use ndarray::{Array, Array4, IxDyn};
use ort::execution_providers::{
    CUDAExecutionProvider, ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

/// Execution provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrtEP {
    #[default]
    CPU,
    CUDA(i32),
    Trt(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    pub trt_fp16: bool,
    pub intra_threads: Option<usize>,
}

/// Thin wrapper around one ONNX Runtime session with a single image input.
pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> Result<Self> {
        let providers: Vec<ExecutionProviderDispatch> = match config.ep {
            OrtEP::CPU => vec![],
            OrtEP::CUDA(device_id) => vec![CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build()],
            OrtEP::Trt(device_id) => vec![
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .with_fp16(config.trt_fp16)
                    .build(),
                // TensorRT cannot take every graph; CUDA picks up the rest
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ],
        };

        let mut builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to set graph optimization level")?;
        if let Some(n) = config.intra_threads {
            builder = builder
                .with_intra_threads(n)
                .context("failed to set intra-op threads")?;
        }
        if !providers.is_empty() {
            builder = builder
                .with_execution_providers(providers)
                .context("failed to register execution providers")?;
        }
        let session = builder
            .commit_from_file(&config.f)
            .with_context(|| format!("failed to load ONNX model {}", config.f.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("model declares no inputs")?;
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            ep: config.ep,
            input_name,
            output_names,
        })
    }

    /// Runs one NCHW batch and returns every output as an owned f32 array.
    pub fn run(&mut self, xs: Array4<f32>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t_run = Instant::now();

        let (n, c, h, w) = xs.dim();
        let data: Vec<f32> = xs.iter().copied().collect();
        let tensor = Tensor::from_array(([n, c, h, w], data.into_boxed_slice()))
            .context("failed to create input tensor")?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .context("ONNX Runtime inference failed")?;

        let mut ys = Vec::with_capacity(self.output_names.len());
        for (name, value) in outputs.iter() {
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .with_context(|| format!("output `{name}` is not an f32 tensor"))?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            ys.push(
                Array::from_shape_vec(IxDyn(&dims), data.to_vec())
                    .with_context(|| format!("output `{name}` has inconsistent shape"))?,
            );
        }

        if profile {
            debug!("[Model Inference]: {:?}", t_run.elapsed());
        }
        Ok(ys)
    }

    pub fn ep(&self) -> OrtEP {
        self.ep
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
