//! Strokes captured from the practice canvas and their rasterization.

use image::Luma;
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use crate::bitmap::RasterBitmap;
use crate::geometry::Point2f;
use crate::types::RasterConfig;

/// One continuous touch gesture, in canvas coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stroke {
    pub points: Vec<Point2f>,
}

impl Stroke {
    pub fn new(points: Vec<Point2f>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Completed strokes plus the stroke currently being drawn, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    strokes: Vec<Stroke>,
    #[serde(skip)]
    current: Option<Stroke>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self {
            strokes: strokes.into_iter().filter(|s| !s.is_empty()).collect(),
            current: None,
        }
    }

    /// Extend the in-progress stroke, opening one if needed.
    pub fn append_point(&mut self, point: Point2f) {
        self.current.get_or_insert_with(Stroke::default).points.push(point);
    }

    pub fn finish_stroke(&mut self) {
        if let Some(stroke) = self.current.take() {
            if !stroke.is_empty() {
                self.strokes.push(stroke);
            }
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.current.as_ref().map_or(true, Stroke::is_empty)
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum::<usize>()
            + self.current.as_ref().map_or(0, Stroke::len)
    }

    /// Render every stroke, the in-progress one included, as round-capped
    /// polylines on a black canvas.
    pub fn rasterize(&self, width: u32, height: u32, cfg: &RasterConfig) -> RasterBitmap {
        let mut bitmap = RasterBitmap::new(width, height);
        let radius = (cfg.stroke_width / 2.0).max(0.5);
        let color = Luma([cfg.ink_intensity]);

        let canvas = bitmap.as_gray_mut();
        for stroke in self.strokes.iter().chain(self.current.iter()) {
            let Some(&first) = stroke.points.first() else {
                continue;
            };
            stamp(canvas, first, radius, color);
            for pair in stroke.points.windows(2) {
                stamp_segment(canvas, pair[0], pair[1], radius, color);
            }
        }

        bitmap
    }
}

fn stamp(canvas: &mut image::GrayImage, p: Point2f, radius: f32, color: Luma<u8>) {
    // Points beyond the padded canvas would leave no ink, and far-off ones
    // overflow i32 inside the circle fill.
    if !inside_padded(canvas, p, radius) {
        return;
    }
    draw_filled_circle_mut(
        canvas,
        (p.x.round() as i32, p.y.round() as i32),
        radius.round() as i32,
        color,
    );
}

fn inside_padded(canvas: &image::GrayImage, p: Point2f, pad: f32) -> bool {
    let (w, h) = canvas.dimensions();
    p.x >= -pad && p.y >= -pad && p.x <= w as f32 + pad && p.y <= h as f32 + pad
}

// Discs spaced at most half a radius apart give round joins and caps
// without gaps along the segment.
fn stamp_segment(
    canvas: &mut image::GrayImage,
    a: Point2f,
    b: Point2f,
    radius: f32,
    color: Luma<u8>,
) {
    let (w, h) = canvas.dimensions();
    let Some((a, b)) = clip_segment(a, b, -radius, w as f32 + radius, -radius, h as f32 + radius)
    else {
        return;
    };

    let step = (radius / 2.0).max(0.5);
    let steps = (a.distance(&b) / step).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let p = Point2f::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        stamp(canvas, p, radius, color);
    }
}

/// Liang-Barsky clip of segment `a`-`b` to the box `[x0, x1] x [y0, y1]`.
/// `None` when nothing of the segment lies inside, or a coordinate is not finite.
fn clip_segment(a: Point2f, b: Point2f, x0: f32, x1: f32, y0: f32, y1: f32) -> Option<(Point2f, Point2f)> {
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;

    for (p, q) in [(-dx, a.x - x0), (dx, x1 - a.x), (-dy, a.y - y0), (dy, y1 - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t_enter = t_enter.max(r);
        } else {
            t_exit = t_exit.min(r);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    let at = |t: f32| Point2f::new(a.x + dx * t, a.y + dy * t);
    Some((at(t_enter), at(t_exit)))
}
