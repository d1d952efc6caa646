//! Geometric comparison of a drawing against a reference glyph.
//!
//! Both bitmaps are reduced to the same coarse grid, which keeps the analysis
//! independent of canvas resolution. Three signals come out of the grids:
//!
//! - bounding-box match: proportions and placement of the ink
//! - stroke coverage: how much of the glyph the learner traced
//! - overflow: how much of the learner's ink lies off the glyph

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::bitmap::{InkGrid, RasterBitmap};
use crate::types::ShapeConfig;

const COVERAGE_WEIGHT: f32 = 0.5;
const BOUNDING_BOX_WEIGHT: f32 = 0.3;
const OVERFLOW_WEIGHT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeAnalysis {
    pub(crate) bounding_box_match: f32,
    pub(crate) stroke_coverage: f32,
    pub(crate) overflow_penalty: f32,
}

impl ShapeAnalysis {
    /// Compare two grids of the same side.
    ///
    /// # Panics
    /// If the grid sizes differ. Callers sample both bitmaps to one grid size.
    pub fn from_grids(user: &InkGrid, reference: &InkGrid, cfg: &ShapeConfig) -> Self {
        assert_eq!(
            user.size(),
            reference.size(),
            "shape analysis needs grids of identical size"
        );

        Self {
            bounding_box_match: bounding_box_match(user, reference, cfg.reference_ink_threshold),
            stroke_coverage: stroke_coverage(user, reference, cfg),
            overflow_penalty: overflow_penalty(user, reference, cfg),
        }
    }

    pub fn bounding_box_match(&self) -> f32 {
        self.bounding_box_match
    }

    pub fn stroke_coverage(&self) -> f32 {
        self.stroke_coverage
    }

    pub fn overflow_penalty(&self) -> f32 {
        self.overflow_penalty
    }

    pub fn combined_score(&self) -> f32 {
        let overflow_term = (1.0 - 2.0 * self.overflow_penalty).max(0.0);
        let score = COVERAGE_WEIGHT * self.stroke_coverage
            + BOUNDING_BOX_WEIGHT * self.bounding_box_match
            + OVERFLOW_WEIGHT * overflow_term;
        score.clamp(0.0, 1.0)
    }
}

impl Serialize for ShapeAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ShapeAnalysis", 4)?;
        s.serialize_field("bounding_box_match", &self.bounding_box_match)?;
        s.serialize_field("stroke_coverage", &self.stroke_coverage)?;
        s.serialize_field("overflow_penalty", &self.overflow_penalty)?;
        s.serialize_field("combined_score", &self.combined_score())?;
        s.end()
    }
}

pub fn analyze_shape(
    user: &RasterBitmap,
    reference: &RasterBitmap,
    cfg: &ShapeConfig,
) -> ShapeAnalysis {
    let user_grid = user.sample_grid(cfg.grid_size);
    let reference_grid = reference.sample_grid(cfg.grid_size);
    ShapeAnalysis::from_grids(&user_grid, &reference_grid, cfg)
}

fn bounding_box_match(user: &InkGrid, reference: &InkGrid, threshold: f32) -> f32 {
    let (Some(user_box), Some(ref_box)) = (user.ink_bounds(threshold), reference.ink_bounds(threshold))
    else {
        return 0.0;
    };

    let aspect = (1.0 - 0.5 * (user_box.aspect_ratio() - ref_box.aspect_ratio()).abs()).max(0.0);

    let size = user.size();
    let offset = user_box
        .normalized_center(size)
        .distance(&ref_box.normalized_center(size));
    let position = (1.0 - 2.0 * offset).max(0.0);

    ((aspect + position) / 2.0).clamp(0.0, 1.0)
}

fn stroke_coverage(user: &InkGrid, reference: &InkGrid, cfg: &ShapeConfig) -> f32 {
    let mut reference_ink = 0usize;
    let mut covered = 0usize;
    for (&u, &r) in user.cells().iter().zip(reference.cells()) {
        if r > cfg.reference_ink_threshold {
            reference_ink += 1;
            if u > cfg.user_ink_threshold {
                covered += 1;
            }
        }
    }

    if reference_ink == 0 {
        return 0.0;
    }
    (covered as f32 / reference_ink as f32).clamp(0.0, 1.0)
}

// The reference cell is judged with the loose threshold: faint glyph edges
// are not overflow, and a pixel-perfect trace never overflows.
fn overflow_penalty(user: &InkGrid, reference: &InkGrid, cfg: &ShapeConfig) -> f32 {
    let mut user_ink = 0usize;
    let mut outside = 0usize;
    for (&u, &r) in user.cells().iter().zip(reference.cells()) {
        if u > cfg.user_ink_threshold {
            user_ink += 1;
            if r <= cfg.user_ink_threshold {
                outside += 1;
            }
        }
    }

    if user_ink == 0 {
        return 0.0;
    }
    (outside as f32 / user_ink as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(size: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RasterBitmap {
        let mut bmp = RasterBitmap::new(size, size);
        for y in y0..y1 {
            for x in x0..x1 {
                bmp.put_pixel(x, y, 255);
            }
        }
        bmp
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_identical_bitmaps_score_perfectly() {
        let cfg = ShapeConfig::default();
        let glyph = rect(200, 60, 30, 140, 170);
        let analysis = analyze_shape(&glyph, &glyph.clone(), &cfg);

        assert_eq!(analysis.stroke_coverage(), 1.0);
        assert_eq!(analysis.overflow_penalty(), 0.0);
        assert_eq!(analysis.bounding_box_match(), 1.0);
        assert_eq!(analysis.combined_score(), 1.0);
    }

    #[test]
    fn test_identical_soft_edged_bitmaps_do_not_overflow() {
        let cfg = ShapeConfig::default();
        let mut glyph = rect(200, 60, 30, 140, 170);
        // a faint halo below the reference threshold but above the user one
        for x in 40..60 {
            for y in 30..170 {
                glyph.put_pixel(x, y, 90);
            }
        }
        let analysis = analyze_shape(&glyph, &glyph.clone(), &cfg);
        assert_eq!(analysis.overflow_penalty(), 0.0);
        assert_eq!(analysis.stroke_coverage(), 1.0);
        assert_eq!(analysis.combined_score(), 1.0);
    }

    #[test]
    fn test_empty_drawing() {
        let cfg = ShapeConfig::default();
        let glyph = rect(200, 60, 30, 140, 170);
        let analysis = analyze_shape(&RasterBitmap::new(200, 200), &glyph, &cfg);

        assert_eq!(analysis.stroke_coverage(), 0.0);
        assert_eq!(analysis.overflow_penalty(), 0.0);
        assert_eq!(analysis.bounding_box_match(), 0.0);
        // only the overflow term contributes
        assert!(approx(analysis.combined_score(), 0.2));
    }

    #[test]
    fn test_empty_reference() {
        let cfg = ShapeConfig::default();
        let drawing = rect(200, 60, 30, 140, 170);
        let analysis = analyze_shape(&drawing, &RasterBitmap::new(200, 200), &cfg);

        assert_eq!(analysis.stroke_coverage(), 0.0);
        assert_eq!(analysis.overflow_penalty(), 1.0);
        assert_eq!(analysis.bounding_box_match(), 0.0);
        assert_eq!(analysis.combined_score(), 0.0);
    }

    #[test]
    fn test_partial_trace() {
        let cfg = ShapeConfig::default();
        // reference: columns 4..16 of a 20 grid; user traced the left half only
        let reference = rect(20, 4, 4, 16, 16);
        let user = rect(20, 4, 4, 10, 16);
        let analysis = analyze_shape(&user, &reference, &cfg);

        assert!(approx(analysis.stroke_coverage(), 0.5));
        assert_eq!(analysis.overflow_penalty(), 0.0);

        // user box 6x12 (0.5), reference 12x12 (1.0); centers 3 cells apart
        let aspect = 1.0 - 0.5 * 0.5;
        let position = 1.0 - 2.0 * 0.15;
        assert!(approx(analysis.bounding_box_match(), (aspect + position) / 2.0));

        let expected = 0.5 * 0.5 + 0.3 * analysis.bounding_box_match() + 0.2;
        assert!(approx(analysis.combined_score(), expected));
    }

    #[test]
    fn test_scribble_outside_glyph() {
        let cfg = ShapeConfig::default();
        let reference = rect(20, 0, 0, 5, 5);
        let user = rect(20, 10, 10, 20, 20);
        let analysis = analyze_shape(&user, &reference, &cfg);

        assert_eq!(analysis.stroke_coverage(), 0.0);
        assert_eq!(analysis.overflow_penalty(), 1.0);
        assert!(analysis.bounding_box_match() >= 0.0);
        assert!(analysis.combined_score() <= 0.3);
    }

    #[test]
    fn test_resolution_independent() {
        let cfg = ShapeConfig::default();
        let small = rect(20, 4, 4, 16, 16);
        let large = rect(400, 80, 80, 320, 320);
        let analysis = analyze_shape(&large, &small, &cfg);
        assert_eq!(analysis.combined_score(), 1.0);
    }

    #[test]
    #[should_panic(expected = "identical size")]
    fn test_grid_size_mismatch_panics() {
        let cfg = ShapeConfig::default();
        let a = InkGrid::from_cells(2, vec![0.0; 4]);
        let b = InkGrid::from_cells(3, vec![0.0; 9]);
        ShapeAnalysis::from_grids(&a, &b, &cfg);
    }

    #[test]
    fn test_metrics_on_hand_built_grids() {
        let cfg = ShapeConfig::default();
        // reference: two solid cells on the top row, one faint edge cell
        let mut reference = vec![0.0; 16];
        reference[0] = 1.0;
        reference[1] = 1.0;
        reference[2] = 0.3;
        // user: hits one glyph cell, the faint edge, and a stray cell
        let mut user = vec![0.0; 16];
        user[0] = 1.0;
        user[1] = 0.1;
        user[2] = 0.6;
        user[15] = 0.4;

        let analysis = ShapeAnalysis::from_grids(
            &InkGrid::from_cells(4, user),
            &InkGrid::from_cells(4, reference),
            &cfg,
        );

        assert!(approx(analysis.stroke_coverage(), 0.5));
        // only the stray cell counts as overflow, the faint edge does not
        assert!(approx(analysis.overflow_penalty(), 1.0 / 3.0));
        // boxes 3x1 vs 2x1, centers an eighth of the grid apart
        assert!(approx(analysis.bounding_box_match(), (0.5 + 0.75) / 2.0));
    }

    #[test]
    fn test_serializes_combined_score() {
        let analysis = ShapeAnalysis {
            bounding_box_match: 1.0,
            stroke_coverage: 1.0,
            overflow_penalty: 0.0,
        };
        let json = serde_json::to_value(analysis).unwrap();
        assert_eq!(json["combined_score"], 1.0);
        assert_eq!(json["overflow_penalty"], 0.0);
    }
}
