#[cfg(feature = "onnx")]
use std::path::Path;
#[cfg(feature = "onnx")]
use std::sync::Mutex;

#[cfg(feature = "onnx")]
use ndarray::{Array4, ArrayD};
#[cfg(feature = "onnx")]
use ort::session::builder::GraphOptimizationLevel;
#[cfg(feature = "onnx")]
use ort::session::Session;
#[cfg(feature = "onnx")]
use ort::value::Tensor;

#[cfg(feature = "onnx")]
use crate::types::RecConfig;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Bitmap buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    BitmapSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Evaluation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Recognizer error: {0}")]
    Recognizer(String),

    #[cfg(feature = "onnx")]
    #[error("ORT error: {0}")]
    Ort(String),

    #[error("Invalid input shape")]
    InvalidInputShape,

    #[error("Preprocess error: {0}")]
    Preprocess(String),
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        EngineError::ImageError(err.to_string())
    }
}

#[cfg(feature = "onnx")]
fn ort_err(err: impl std::fmt::Display) -> EngineError {
    EngineError::Ort(err.to_string())
}

/// ONNX Runtime session guarded for use from the blocking pool.
#[cfg(feature = "onnx")]
pub struct OrtSession {
    session: Mutex<Session>,
    input_name: String,
}

#[cfg(feature = "onnx")]
impl OrtSession {
    pub fn from_rec_config(cfg: &RecConfig) -> Result<Self, EngineError> {
        Self::from_path(&cfg.model_path, cfg.intra_op_num_threads)
    }

    fn from_path(model_path: &Path, intra_threads: usize) -> Result<Self, EngineError> {
        let mut builder = Session::builder()
            .map_err(ort_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_err)?;

        if intra_threads > 0 {
            builder = builder.with_intra_threads(intra_threads).map_err(ort_err)?;
        }

        let session = builder.commit_from_file(model_path).map_err(ort_err)?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    pub fn run(&self, input: Array4<f32>) -> Result<ArrayD<f32>, EngineError> {
        let tensor = Tensor::from_array(input).map_err(ort_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::Recognizer("ORT session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(ort_err)?;

        if outputs.len() == 0 {
            return Err(EngineError::InvalidInputShape);
        }
        let view = outputs[0].try_extract_array::<f32>().map_err(ort_err)?;
        Ok(view.to_owned())
    }

    /// Character list embedded in the model metadata, if any.
    pub fn get_character_list(&self, key: &str) -> Option<Vec<String>> {
        let session = self.session.lock().ok()?;
        let meta = session.metadata().ok()?;
        let value = meta.custom(key).ok()??;
        Some(value.lines().map(|l| l.to_string()).collect())
    }
}
