//! Recognition engine: runs text recognition and shape analysis side by side
//! and fuses both signals into one score.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bitmap::RasterBitmap;
use crate::engine::EngineError;
use crate::letters::compare_letters;
use crate::rec::TextRecognizer;
use crate::shape::{analyze_shape, ShapeAnalysis};
use crate::types::{EvaluatorConfig, ShapeConfig};

/// Thresholds and factors used to blend the text and shape scores.
///
/// The defaults are hand-tuned; they are kept configurable for retuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionPolicy {
    /// Text score from which recognition is trusted outright
    pub high_text_threshold: f32,
    /// Non-zero text scores below this indicate a different letter was read
    pub weak_text_threshold: f32,
    pub weak_text_factor: f32,
    /// Applied to the shape score when text gives no usable signal
    pub uncorroborated_factor: f32,
    /// Coverage below this caps the final score at the coverage
    pub min_coverage: f32,
    /// Overflow above this scales the final score down
    pub max_overflow: f32,
    pub overflow_weight: f32,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            high_text_threshold: 0.7,
            weak_text_threshold: 0.5,
            weak_text_factor: 0.3,
            uncorroborated_factor: 0.8,
            min_coverage: 0.3,
            max_overflow: 0.5,
            overflow_weight: 0.5,
        }
    }
}

impl FusionPolicy {
    /// Tiered blend of the text and shape scores.
    pub fn blend(&self, text_score: f32, shape_score: f32) -> f32 {
        let text_score = text_score.clamp(0.0, 1.0);
        let shape_score = shape_score.clamp(0.0, 1.0);

        let blended = if text_score >= self.high_text_threshold {
            text_score.max(shape_score)
        } else if text_score > 0.0 && text_score < self.weak_text_threshold {
            shape_score * self.weak_text_factor
        } else {
            shape_score * self.uncorroborated_factor
        };
        blended.clamp(0.0, 1.0)
    }

    /// Coverage cap and overflow discount, applied after blending.
    pub fn apply_shape_caps(&self, score: f32, shape: &ShapeAnalysis) -> f32 {
        let mut score = score.clamp(0.0, 1.0);

        let coverage = shape.stroke_coverage();
        if coverage < self.min_coverage {
            score = score.min(coverage);
        }

        let overflow = shape.overflow_penalty();
        if overflow > self.max_overflow {
            score *= 1.0 - overflow * self.overflow_weight;
        }

        score.clamp(0.0, 1.0)
    }

    pub fn fuse(&self, text_score: f32, shape: &ShapeAnalysis) -> f32 {
        let blended = self.blend(text_score, shape.combined_score());
        self.apply_shape_caps(blended, shape)
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    /// Final confidence in `[0, 1]`
    pub score: f32,
    pub recognized_text: Option<String>,
    pub text_score: f32,
    pub shape_analysis: ShapeAnalysis,
}

/// Stateless evaluator; one call per learner submission.
#[derive(Clone)]
pub struct RecognitionEngine {
    recognizer: Arc<dyn TextRecognizer>,
    shape: ShapeConfig,
    fusion: FusionPolicy,
    recognizer_timeout: Duration,
}

impl RecognitionEngine {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &EvaluatorConfig) -> Self {
        Self {
            recognizer,
            shape: config.shape,
            fusion: config.fusion,
            recognizer_timeout: config.recognizer_timeout(),
        }
    }

    pub fn fusion(&self) -> &FusionPolicy {
        &self.fusion
    }

    /// Grade `user` against `reference` for the letter `expected`.
    ///
    /// Recognition and shape analysis run concurrently on the blocking pool and
    /// are both awaited before fusion. Recognition failures and timeouts count
    /// as "no text"; only a failed shape task is an error.
    pub async fn evaluate(
        &self,
        user: RasterBitmap,
        reference: RasterBitmap,
        expected: &str,
    ) -> Result<RecognitionResult, EngineError> {
        let user = Arc::new(user);

        let text_task = {
            let recognizer = Arc::clone(&self.recognizer);
            let bitmap = Arc::clone(&user);
            let timeout = self.recognizer_timeout;
            async move {
                let task = tokio::task::spawn_blocking(move || recognizer.recognize(&bitmap));
                match tokio::time::timeout(timeout, task).await {
                    Ok(Ok(Ok(text))) => text,
                    Ok(Ok(Err(err))) => {
                        warn!("text recognition failed: {err}");
                        None
                    }
                    Ok(Err(err)) => {
                        warn!("text recognition task failed: {err}");
                        None
                    }
                    Err(_) => {
                        warn!("text recognition timed out after {timeout:?}");
                        None
                    }
                }
            }
        };

        let shape_task = {
            let bitmap = Arc::clone(&user);
            let cfg = self.shape;
            tokio::task::spawn_blocking(move || analyze_shape(&bitmap, &reference, &cfg))
        };

        let (recognized_text, shape_analysis) = tokio::join!(text_task, shape_task);
        let shape_analysis = shape_analysis?;

        let text_score = compare_letters(recognized_text.as_deref(), expected);
        let score = self.fusion.fuse(text_score, &shape_analysis);

        debug!(
            expected,
            recognized = ?recognized_text,
            text_score,
            shape_score = shape_analysis.combined_score(),
            coverage = shape_analysis.stroke_coverage(),
            overflow = shape_analysis.overflow_penalty(),
            score,
            "evaluated drawing"
        );

        Ok(RecognitionResult {
            score,
            recognized_text,
            text_score,
            shape_analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rec::{FixedRecognizer, NullRecognizer};

    fn shape(bbox: f32, coverage: f32, overflow: f32) -> ShapeAnalysis {
        ShapeAnalysis {
            bounding_box_match: bbox,
            stroke_coverage: coverage,
            overflow_penalty: overflow,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn rect(size: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RasterBitmap {
        let mut bmp = RasterBitmap::new(size, size);
        for y in y0..y1 {
            for x in x0..x1 {
                bmp.put_pixel(x, y, 255);
            }
        }
        bmp
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _bitmap: &RasterBitmap) -> Result<Option<String>, EngineError> {
            Err(EngineError::Recognizer("no capability".to_string()))
        }
    }

    struct SlowRecognizer;

    impl TextRecognizer for SlowRecognizer {
        fn recognize(&self, _bitmap: &RasterBitmap) -> Result<Option<String>, EngineError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Some("ب".to_string()))
        }
    }

    fn engine(recognizer: Arc<dyn TextRecognizer>) -> RecognitionEngine {
        RecognitionEngine::new(recognizer, &EvaluatorConfig::default())
    }

    #[test]
    fn test_blend_tiers() {
        let p = FusionPolicy::default();
        // confident text wins over a weak shape
        assert!(approx(p.blend(0.9, 0.2), 0.9));
        // a strong shape can still beat confident text
        assert!(approx(p.blend(0.7, 0.95), 0.95));
        // wrong letter read: shape heavily discounted
        assert!(approx(p.blend(0.3, 0.9), 0.27));
        // no text, or the unassigned gap: shape slightly discounted
        assert!(approx(p.blend(0.0, 0.9), 0.72));
        assert!(approx(p.blend(0.6, 0.5), 0.4));
        assert!(approx(p.blend(0.5, 0.5), 0.4));
    }

    #[test]
    fn test_overflow_discount() {
        let p = FusionPolicy::default();
        let s = shape(1.0, 1.0, 0.6);
        assert!(approx(p.apply_shape_caps(0.8, &s), 0.56));

        // at the cutoff nothing happens
        let s = shape(1.0, 1.0, 0.5);
        assert!(approx(p.apply_shape_caps(0.8, &s), 0.8));
    }

    #[test]
    fn test_coverage_cap() {
        let p = FusionPolicy::default();
        assert!(approx(p.apply_shape_caps(1.0, &shape(1.0, 0.1, 0.0)), 0.1));
        assert!(approx(p.apply_shape_caps(1.0, &shape(1.0, 0.0, 0.0)), 0.0));
        assert!(approx(p.apply_shape_caps(0.9, &shape(1.0, 0.3, 0.0)), 0.9));
    }

    #[test]
    fn test_fuse_stays_in_unit_interval() {
        let p = FusionPolicy::default();
        let values = [0.0f32, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0];
        for &t in &values {
            for &b in &values {
                for &c in &values {
                    for &o in &values {
                        let score = p.fuse(t, &shape(b, c, o));
                        assert!((0.0..=1.0).contains(&score), "t={t} b={b} c={c} o={o}");
                    }
                }
            }
        }
        // out-of-range inputs are clamped too
        assert!(p.blend(1.5, 2.0) <= 1.0);
        assert!(p.blend(-1.0, -1.0) >= 0.0);
    }

    #[tokio::test]
    async fn test_empty_drawing_scores_zero_even_with_matching_text() {
        let reference = rect(100, 30, 20, 70, 80);
        let engine = engine(Arc::new(FixedRecognizer::new(Some("ب".to_string()))));

        let result = engine
            .evaluate(RasterBitmap::new(100, 100), reference, "ب")
            .await
            .unwrap();
        assert_eq!(result.text_score, 1.0);
        assert_eq!(result.shape_analysis.stroke_coverage(), 0.0);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_perfect_trace_without_ocr() {
        let reference = rect(100, 30, 20, 70, 80);
        let engine = engine(Arc::new(NullRecognizer));

        let result = engine
            .evaluate(reference.clone(), reference, "ب")
            .await
            .unwrap();
        assert_eq!(result.recognized_text, None);
        assert_eq!(result.text_score, 0.0);
        assert!(approx(result.score, 0.8));
    }

    #[tokio::test]
    async fn test_perfect_trace_with_matching_text() {
        let reference = rect(100, 30, 20, 70, 80);
        let engine = engine(Arc::new(FixedRecognizer::new(Some("بَ".to_string()))));

        let result = engine
            .evaluate(reference.clone(), reference, "ب")
            .await
            .unwrap();
        assert_eq!(result.recognized_text.as_deref(), Some("بَ"));
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_recognizer_error_degrades_to_no_text() {
        let reference = rect(100, 30, 20, 70, 80);
        let engine = engine(Arc::new(FailingRecognizer));

        let result = engine
            .evaluate(reference.clone(), reference, "ب")
            .await
            .unwrap();
        assert_eq!(result.recognized_text, None);
        assert!(approx(result.score, 0.8));
    }

    #[tokio::test]
    async fn test_recognizer_timeout_degrades_to_no_text() {
        let reference = rect(100, 30, 20, 70, 80);
        let config = EvaluatorConfig {
            recognizer_timeout_ms: 20,
            ..EvaluatorConfig::default()
        };
        let engine = RecognitionEngine::new(Arc::new(SlowRecognizer), &config);

        let result = engine
            .evaluate(reference.clone(), reference, "ب")
            .await
            .unwrap();
        assert_eq!(result.recognized_text, None);
        assert!(approx(result.score, 0.8));
    }

    #[tokio::test]
    async fn test_result_serializes_for_review_screen() {
        let reference = rect(100, 30, 20, 70, 80);
        let engine = engine(Arc::new(FixedRecognizer::new(Some("ش".to_string()))));

        let result = engine
            .evaluate(reference.clone(), reference, "س")
            .await
            .unwrap();
        assert!(approx(result.text_score, 0.7));
        assert_eq!(result.score, 1.0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["recognized_text"], "ش");
        assert_eq!(json["shape_analysis"]["stroke_coverage"], 1.0);
    }
}
