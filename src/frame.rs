//! RGB frame buffer and annotation.
//!
//! A `Frame` is one decoded image (height x width x 3, 8-bit RGB). The
//! pipeline annotates the representative detection onto the frame before the
//! artifact write, so the stored image shows what was detected.

use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::detect::Detection;

const BOX_THICKNESS: u32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0];
const JPEG_QUALITY: u8 = 85;

/// One decoded video frame, tightly packed RGB8.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Draw the detection's bounding box onto the frame as a hollow
    /// rectangle. Coordinates outside the frame are clamped; a degenerate box
    /// draws nothing.
    pub fn annotate(&mut self, detection: &Detection) {
        let bbox = &detection.bbox;
        let x1 = clamp_coord(bbox.x1, self.width);
        let y1 = clamp_coord(bbox.y1, self.height);
        let x2 = clamp_coord(bbox.x2, self.width);
        let y2 = clamp_coord(bbox.y2, self.height);
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        for t in 0..BOX_THICKNESS {
            // Horizontal edges.
            if y1 + t < self.height {
                self.draw_row(y1 + t, x1, x2);
            }
            if y2 >= t + 1 {
                self.draw_row(y2 - t - 1, x1, x2);
            }
            // Vertical edges.
            if x1 + t < self.width {
                self.draw_col(x1 + t, y1, y2);
            }
            if x2 >= t + 1 {
                self.draw_col(x2 - t - 1, y1, y2);
            }
        }
    }

    fn draw_row(&mut self, y: u32, x1: u32, x2: u32) {
        for x in x1..x2.min(self.width) {
            self.put_pixel(x, y);
        }
    }

    fn draw_col(&mut self, x: u32, y1: u32, y2: u32) {
        for y in y1..y2.min(self.height) {
            self.put_pixel(x, y);
        }
    }

    fn put_pixel(&mut self, x: u32, y: u32) {
        let idx = ((y * self.width + x) * 3) as usize;
        self.pixels[idx..idx + 3].copy_from_slice(&BOX_COLOR);
    }

    /// Encode the frame as a JPEG image.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder.encode(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }
}

fn clamp_coord(value: f32, max: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    (value as u32).min(max)
}
