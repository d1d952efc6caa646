use std::path::Path;
#[cfg(feature = "onnx")]
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::recognition::FusionPolicy;

/// Largest canvas side the rasterizer accepts
pub const MAX_CANVAS_SIZE: u32 = 4096;

/// Grid resolution and ink thresholds used by the shape analyzer.
///
/// Thresholds are normalized intensities in `[0, 1]`. The reference threshold is
/// the stricter of the two: it decides which cells belong to the glyph, while the
/// user threshold only decides whether a stroke landed on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub grid_size: u32,
    pub reference_ink_threshold: f32,
    pub user_ink_threshold: f32,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            reference_ink_threshold: 0.5,
            user_ink_threshold: 0.2,
        }
    }
}

/// How drawings and reference glyphs are rasterized before evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Side of the square canvas both bitmaps are rendered on
    pub canvas_size: u32,
    pub stroke_width: f32,
    pub ink_intensity: u8,
    /// Glyph pixel size as a fraction of the canvas height
    pub glyph_scale: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            canvas_size: 300,
            stroke_width: 18.0,
            ink_intensity: 255,
            glyph_scale: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub shape: ShapeConfig,
    pub fusion: FusionPolicy,
    pub raster: RasterConfig,
    /// Upper bound on a single text recognition call
    pub recognizer_timeout_ms: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            shape: ShapeConfig::default(),
            fusion: FusionPolicy::default(),
            raster: RasterConfig::default(),
            recognizer_timeout_ms: 2000,
        }
    }
}

impl EvaluatorConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject sizes the rasterizer and grid sampler cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let canvas = self.raster.canvas_size;
        if canvas == 0 || canvas > MAX_CANVAS_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "canvas_size must be in 1..={MAX_CANVAS_SIZE}, got {canvas}"
            )));
        }

        let grid = self.shape.grid_size;
        if grid == 0 || grid > canvas {
            return Err(EngineError::InvalidConfig(format!(
                "grid_size must be in 1..={canvas} (canvas_size), got {grid}"
            )));
        }
        Ok(())
    }

    pub fn recognizer_timeout(&self) -> Duration {
        Duration::from_millis(self.recognizer_timeout_ms)
    }
}

/// Settings for the ONNX text recognizer.
#[cfg(feature = "onnx")]
#[derive(Clone, Debug)]
pub struct RecConfig {
    pub model_path: PathBuf,
    pub rec_keys_path: Option<PathBuf>,
    /// Model input as `[channels, height, width]`
    pub rec_img_shape: [usize; 3],
    /// Minimum mean CTC confidence for a result to count as recognized
    pub text_score: f32,
    /// Drawings are light ink on black; recognition models expect dark text
    pub invert: bool,
    pub intra_op_num_threads: usize,
}

#[cfg(feature = "onnx")]
impl RecConfig {
    pub fn ppv5(model_path: PathBuf) -> Self {
        // Auto-detect optimal thread count (use all available CPUs)
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            model_path,
            rec_keys_path: None,
            rec_img_shape: [3, 48, 320],
            text_score: 0.5,
            invert: true,
            intra_op_num_threads: num_threads,
        }
    }
}
