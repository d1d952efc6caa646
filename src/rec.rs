//! Text recognition seam.
//!
//! Recognition is an outside capability: the host platform's OCR, an ONNX
//! model, or nothing at all. The engine only ever consumes an optional string.

#[cfg(feature = "onnx")]
use std::fs::File;
#[cfg(feature = "onnx")]
use std::io::{BufRead, BufReader};

#[cfg(feature = "onnx")]
use image::imageops::{self, FilterType};
#[cfg(feature = "onnx")]
use ndarray::{Array3, Array4, Axis, Ix3};

use crate::bitmap::RasterBitmap;
use crate::engine::EngineError;
#[cfg(feature = "onnx")]
use crate::engine::OrtSession;
#[cfg(feature = "onnx")]
use crate::types::RecConfig;

/// Anything that can read text off a rendered drawing.
///
/// `Ok(None)` means nothing was recognized. Errors are reported to the engine,
/// which treats them the same as `Ok(None)`.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, bitmap: &RasterBitmap) -> Result<Option<String>, EngineError>;
}

/// No OCR capability on this device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(&self, _bitmap: &RasterBitmap) -> Result<Option<String>, EngineError> {
        Ok(None)
    }
}

/// Text already recognized by the caller, e.g. the platform's native OCR.
#[derive(Debug, Clone, Default)]
pub struct FixedRecognizer {
    text: Option<String>,
}

impl FixedRecognizer {
    pub fn new(text: Option<String>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        Self { text }
    }
}

impl TextRecognizer for FixedRecognizer {
    fn recognize(&self, _bitmap: &RasterBitmap) -> Result<Option<String>, EngineError> {
        Ok(self.text.clone())
    }
}

#[cfg(feature = "onnx")]
struct CtcDecoder {
    chars: Vec<String>,
}

#[cfg(feature = "onnx")]
impl CtcDecoder {
    fn from_cfg(cfg: &RecConfig, session: &OrtSession) -> Result<Self, EngineError> {
        let mut chars = session.get_character_list("character");

        if chars.is_none() {
            if let Some(path) = &cfg.rec_keys_path {
                let reader = BufReader::new(File::open(path)?);
                let mut list = Vec::new();
                for line in reader.lines() {
                    list.push(line?);
                }
                chars = Some(list);
            }
        }

        let character_list = chars.ok_or_else(|| {
            EngineError::Preprocess("no character list found for recognizer".to_string())
        })?;
        Ok(Self::from_list(character_list))
    }

    fn from_list(mut character_list: Vec<String>) -> Self {
        character_list.push(" ".to_string());
        character_list.insert(0, "blank".to_string());
        Self {
            chars: character_list,
        }
    }

    /// Greedy CTC decode of a single `[1, T, C]` prediction.
    fn decode(&self, preds: &Array3<f32>) -> (String, f32) {
        let Some(batch) = preds.axis_iter(Axis(0)).next() else {
            return (String::new(), 0.0);
        };

        let mut text = String::new();
        let mut confs: Vec<f32> = Vec::new();
        let mut prev: Option<usize> = None;

        for row in batch.axis_iter(Axis(0)) {
            let mut best_idx = 0usize;
            let mut best_val = f32::MIN;
            for (ci, &v) in row.iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best_idx = ci;
                }
            }

            // blank is index 0; repeats collapse until a different token
            if best_idx != 0 && Some(best_idx) != prev {
                if let Some(ch) = self.chars.get(best_idx) {
                    text.push_str(ch);
                    confs.push(best_val);
                }
            }
            prev = Some(best_idx);
        }

        let mean = if confs.is_empty() {
            0.0
        } else {
            confs.iter().sum::<f32>() / confs.len() as f32
        };
        (text.trim().to_string(), mean)
    }
}

/// CRNN text recognizer running through ONNX Runtime.
#[cfg(feature = "onnx")]
pub struct OnnxRecognizer {
    cfg: RecConfig,
    session: OrtSession,
    decoder: CtcDecoder,
}

#[cfg(feature = "onnx")]
impl OnnxRecognizer {
    pub fn new(cfg: RecConfig) -> Result<Self, EngineError> {
        let session = OrtSession::from_rec_config(&cfg)?;
        let decoder = CtcDecoder::from_cfg(&cfg, &session)?;
        Ok(Self {
            cfg,
            session,
            decoder,
        })
    }

    /// Resize to the model height keeping the aspect ratio, pad right with
    /// background, and normalize to `[-1, 1]` in every channel.
    fn resize_norm_img(&self, bitmap: &RasterBitmap) -> Result<Array3<f32>, EngineError> {
        let [img_c, img_h, img_w] = self.cfg.rec_img_shape;
        let (w, h) = bitmap.dimensions();
        if h == 0 || w == 0 {
            return Err(EngineError::Preprocess("invalid image size".to_string()));
        }

        let ratio = w as f32 / h as f32;
        let resized_w = ((img_h as f32 * ratio).ceil() as usize).clamp(1, img_w);
        let resized = imageops::resize(
            bitmap.as_gray(),
            resized_w as u32,
            img_h as u32,
            FilterType::Triangle,
        );

        let background = if self.cfg.invert { 1.0 } else { -1.0 };
        let mut out = Array3::<f32>::from_elem((img_c, img_h, img_w), background);
        for (x, y, pix) in resized.enumerate_pixels() {
            let mut v = pix[0] as f32 / 255.0;
            if self.cfg.invert {
                v = 1.0 - v;
            }
            for c in 0..img_c {
                out[[c, y as usize, x as usize]] = (v - 0.5) / 0.5;
            }
        }

        Ok(out)
    }
}

#[cfg(feature = "onnx")]
impl TextRecognizer for OnnxRecognizer {
    fn recognize(&self, bitmap: &RasterBitmap) -> Result<Option<String>, EngineError> {
        if !bitmap.has_ink() {
            return Ok(None);
        }

        let norm = self.resize_norm_img(bitmap)?;
        let batch: Array4<f32> = norm.insert_axis(Axis(0));

        let preds: Array3<f32> = self
            .session
            .run(batch)?
            .into_dimensionality::<Ix3>()
            .map_err(|_| EngineError::InvalidInputShape)?;

        let (text, score) = self.decoder.decode(&preds);
        tracing::debug!(text = %text, score, "onnx recognition");

        if text.is_empty() || score < self.cfg.text_score {
            return Ok(None);
        }
        Ok(Some(text))
    }
}
