//! # Harf - Handwriting Evaluation for Arabic Letter Practice
//!
//! Harf grades a learner's hand-drawn Arabic letter against a reference glyph.
//! Two independent signals are combined:
//!
//! - **Text recognition**: what an OCR capability reads off the drawing, compared
//!   to the expected letter with diacritic stripping and confusable-letter groups
//! - **Shape analysis**: coverage, overflow and bounding-box alignment of the
//!   drawing's ink against the glyph's ink on a coarse grid
//!
//! Both run concurrently and are fused into a single confidence in `[0, 1]`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harf::{Drawing, EvaluatorConfig, HandwritingEvaluator, NullRecognizer, Point2f};
//!
//! # async fn run() -> Result<(), harf::EngineError> {
//! let evaluator = HandwritingEvaluator::new(
//!     Arc::new(NullRecognizer),
//!     "fonts/NotoNaskhArabic-Regular.ttf",
//!     EvaluatorConfig::default(),
//! )?;
//!
//! let mut drawing = Drawing::new();
//! drawing.append_point(Point2f::new(120.0, 80.0));
//! drawing.append_point(Point2f::new(150.0, 220.0));
//! drawing.finish_stroke();
//!
//! let result = evaluator.evaluate_drawing(&drawing, "ا").await?;
//! println!("score {:.2}", result.score);
//! # Ok(())
//! # }
//! ```

// Core modules
mod bitmap;
mod drawing;
mod engine;
mod geometry;
mod glyph;
mod rec;
mod recognition;
mod shape;
mod types;

pub mod diacritics;
pub mod letters;

// FFI module for C bindings
#[cfg(feature = "ffi")]
pub mod ffi;

// Public API exports
pub use crate::bitmap::{InkGrid, RasterBitmap};
pub use crate::diacritics::DiacriticInfo;
pub use crate::drawing::{Drawing, Stroke};
pub use crate::engine::EngineError;
pub use crate::geometry::{InkBounds, Point2f};
pub use crate::glyph::GlyphRenderer;
pub use crate::letters::compare_letters;
pub use crate::rec::{FixedRecognizer, NullRecognizer, TextRecognizer};
pub use crate::recognition::{FusionPolicy, RecognitionEngine, RecognitionResult};
pub use crate::shape::{analyze_shape, ShapeAnalysis};
pub use crate::types::{EvaluatorConfig, RasterConfig, ShapeConfig};

#[cfg(feature = "onnx")]
pub use crate::rec::OnnxRecognizer;
#[cfg(feature = "onnx")]
pub use crate::types::RecConfig;

use std::path::Path;
use std::sync::Arc;

/// Grades drawings end to end: rasterizes strokes, renders the reference
/// glyph, and runs the recognition engine.
pub struct HandwritingEvaluator {
    engine: RecognitionEngine,
    renderer: GlyphRenderer,
    raster: RasterConfig,
}

impl HandwritingEvaluator {
    pub fn new<P: AsRef<Path>>(
        recognizer: Arc<dyn TextRecognizer>,
        font_path: P,
        config: EvaluatorConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let renderer = GlyphRenderer::from_file(font_path, config.raster.glyph_scale)?;
        Ok(Self::with_renderer(recognizer, renderer, config))
    }

    pub fn with_renderer(
        recognizer: Arc<dyn TextRecognizer>,
        renderer: GlyphRenderer,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            engine: RecognitionEngine::new(recognizer, &config),
            renderer,
            raster: config.raster,
        }
    }

    pub fn engine(&self) -> &RecognitionEngine {
        &self.engine
    }

    /// Reference bitmap for `letter` at the configured canvas size.
    pub fn reference_bitmap(&self, letter: &str) -> RasterBitmap {
        let side = self.raster.canvas_size;
        self.renderer.render(letter, side, side)
    }

    pub async fn evaluate_drawing(
        &self,
        drawing: &Drawing,
        letter: &str,
    ) -> Result<RecognitionResult, EngineError> {
        let side = self.raster.canvas_size;
        let user = drawing.rasterize(side, side, &self.raster);
        let reference = self.reference_bitmap(letter);
        self.engine.evaluate(user, reference, letter).await
    }
}
