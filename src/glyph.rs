//! Reference glyph rendering.

use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, Rect, ScaleFont};
use image::Luma;
use imageproc::drawing::draw_text_mut;

use crate::bitmap::RasterBitmap;
use crate::engine::EngineError;

/// Renders a target letter, centered, in white on black.
pub struct GlyphRenderer {
    font: FontVec,
    /// Pixel size of the glyph as a fraction of the bitmap height
    glyph_scale: f32,
}

impl GlyphRenderer {
    pub fn from_file<P: AsRef<Path>>(path: P, glyph_scale: f32) -> Result<Self, EngineError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data, glyph_scale)
    }

    pub fn from_bytes(data: Vec<u8>, glyph_scale: f32) -> Result<Self, EngineError> {
        let font = FontVec::try_from_vec(data).map_err(|e| EngineError::Font(e.to_string()))?;
        Ok(Self { font, glyph_scale })
    }

    pub fn render(&self, letter: &str, width: u32, height: u32) -> RasterBitmap {
        let mut bitmap = RasterBitmap::new(width, height);
        let scale = PxScale::from((height as f32 * self.glyph_scale).max(1.0));

        let Some(ink) = self.ink_extent(letter, scale) else {
            return bitmap;
        };

        // Center the inked area, not the line box: Arabic letters sit
        // unevenly around the baseline.
        let x = (width as f32 - ink.width()) / 2.0 - ink.min.x;
        let y = (height as f32 - ink.height()) / 2.0 - ink.min.y;

        draw_text_mut(
            bitmap.as_gray_mut(),
            Luma([255u8]),
            x.round() as i32,
            y.round() as i32,
            scale,
            &self.font,
            letter,
        );
        bitmap
    }

    /// Pixel bounds of the outlined glyphs, laid out the way `draw_text_mut`
    /// lays them out from an origin of `(0, 0)`.
    fn ink_extent(&self, text: &str, scale: PxScale) -> Option<Rect> {
        let scaled = self.font.as_scaled(scale);
        let mut cursor = 0.0f32;
        let mut extent: Option<Rect> = None;

        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            let glyph = id.with_scale_and_position(scale, point(cursor, scaled.ascent()));
            cursor += scaled.h_advance(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bb = outlined.px_bounds();
                extent = Some(match extent {
                    Some(e) => Rect {
                        min: point(e.min.x.min(bb.min.x), e.min.y.min(bb.min.y)),
                        max: point(e.max.x.max(bb.max.x), e.max.y.max(bb.max.y)),
                    },
                    None => bb,
                });
            }
        }

        extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_font_data_is_rejected() {
        let err = GlyphRenderer::from_bytes(vec![0u8; 16], 0.7).err().unwrap();
        assert!(matches!(err, EngineError::Font(_)));
    }

    const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts/DejaVuSans.ttf");

    #[test]
    fn test_render_centers_glyph() {
        let renderer = GlyphRenderer::from_file(TEST_FONT, 0.7).unwrap();

        let bmp = renderer.render("ب", 200, 200);
        assert_eq!(bmp.dimensions(), (200, 200));
        assert!(bmp.has_ink());

        let bounds = bmp.sample_grid(20).ink_bounds(0.1).unwrap();
        let center = bounds.normalized_center(20);
        assert!((center.x - 0.5).abs() < 0.2, "center x {}", center.x);
        assert!((center.y - 0.5).abs() < 0.3, "center y {}", center.y);
    }

    #[test]
    fn test_render_whitespace_is_blank() {
        let renderer = GlyphRenderer::from_file(TEST_FONT, 0.7).unwrap();
        assert!(!renderer.render(" ", 64, 64).has_ink());
    }

    #[test]
    fn test_missing_font_file_is_io_error() {
        let err = GlyphRenderer::from_file("/nonexistent/font.ttf", 0.7).err().unwrap();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
