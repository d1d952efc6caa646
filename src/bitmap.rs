//! Single-channel bitmaps and the coarse ink grids the shape analyzer works on.

use std::path::Path;

use image::{GrayImage, ImageReader, Luma};

use crate::engine::EngineError;
use crate::geometry::InkBounds;

/// 8-bit grayscale raster: ink is bright, background is black.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBitmap {
    image: GrayImage,
}

impl RasterBitmap {
    /// Blank (all black) bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize;
        let actual = data.len();
        let image = GrayImage::from_raw(width, height, data).ok_or(EngineError::BitmapSize {
            width,
            height,
            expected,
            actual,
        })?;
        Ok(Self::from_gray(image))
    }

    /// Decode any supported image file, converting it to luma.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(Self::from_gray(img.to_luma8()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        self.image.save(path)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, value: u8) {
        self.image.put_pixel(x, y, Luma([value]));
    }

    pub fn has_ink(&self) -> bool {
        self.image.as_raw().iter().any(|&v| v > 0)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub(crate) fn as_gray_mut(&mut self) -> &mut GrayImage {
        &mut self.image
    }

    /// Area-average the bitmap down to a `size`×`size` grid of normalized
    /// intensities. Each cell covers at least one source pixel.
    pub fn sample_grid(&self, size: u32) -> InkGrid {
        let size = size.max(1);
        let (w, h) = self.dimensions();
        let side = size as usize;
        let mut cells = vec![0.0f32; cell_count(size)];
        if w == 0 || h == 0 {
            return InkGrid { size, cells };
        }

        let raw = self.image.as_raw();
        for gy in 0..size {
            let (y0, y1) = cell_span(gy, size, h);
            for gx in 0..size {
                let (x0, x1) = cell_span(gx, size, w);

                let mut sum = 0u64;
                for y in y0..y1 {
                    let row = y as usize * w as usize;
                    for x in x0..x1 {
                        sum += raw[row + x as usize] as u64;
                    }
                }
                let count = (y1 - y0) as f32 * (x1 - x0) as f32;
                cells[gy as usize * side + gx as usize] = sum as f32 / count / 255.0;
            }
        }

        InkGrid { size, cells }
    }
}

fn cell_count(size: u32) -> usize {
    (size as usize).saturating_mul(size as usize)
}

/// Pixel range `[start, end)` covered by cell `index` of `cells` along an
/// axis of `len` pixels.
fn cell_span(index: u32, cells: u32, len: u32) -> (u32, u32) {
    let start = ((index as u64 * len as u64) / cells as u64) as u32;
    let end = (((index as u64 + 1) * len as u64) / cells as u64) as u32;
    let start = start.min(len - 1);
    (start, end.max(start + 1).min(len))
}

/// Square grid of normalized intensities in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct InkGrid {
    size: u32,
    cells: Vec<f32>,
}

impl InkGrid {
    pub fn from_cells(size: u32, cells: Vec<f32>) -> Self {
        let expected = cell_count(size);
        assert_eq!(cells.len(), expected, "grid of side {size} needs {expected} cells");
        Self { size, cells }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.cells[y as usize * self.size as usize + x as usize]
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn is_ink(&self, x: u32, y: u32, threshold: f32) -> bool {
        self.at(x, y) > threshold
    }

    pub fn ink_count(&self, threshold: f32) -> usize {
        self.cells.iter().filter(|&&v| v > threshold).count()
    }

    /// Tight box around cells brighter than `threshold`, `None` without ink.
    pub fn ink_bounds(&self, threshold: f32) -> Option<InkBounds> {
        let mut bounds: Option<InkBounds> = None;
        for y in 0..self.size {
            for x in 0..self.size {
                if !self.is_ink(x, y, threshold) {
                    continue;
                }
                match bounds.as_mut() {
                    Some(b) => b.include(x, y),
                    None => bounds = Some(InkBounds::at(x, y)),
                }
            }
        }
        bounds
    }
}
