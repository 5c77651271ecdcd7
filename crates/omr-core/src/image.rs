//! Owned and borrowed 8-bit image buffers plus bilinear sampling.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Borrowed row-major grayscale buffer.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned row-major grayscale buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image of the given size filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing buffer, checking its length.
    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = checked_len(width, height, 1)?;
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

/// Channel layout of a decoded photograph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },
}

fn checked_len(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ImageError::InvalidDimensions { width, height })
}

/// A decoded photograph as handed over by the caller.
///
/// Immutable once constructed; the pipeline only ever reads it through
/// [`RawImage::to_gray`].
#[derive(Clone, Debug)]
pub struct RawImage {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl RawImage {
    /// Validate and wrap an interleaved pixel buffer.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        let expected = checked_len(width, height, format.channels())?;
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn from_gray(img: GrayImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            format: PixelFormat::Gray,
            data: img.data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Luminance plane (Rec.601 weights for colour input).
    pub fn to_gray(&self) -> GrayImage {
        let data = match self.format {
            PixelFormat::Gray => self.data.clone(),
            PixelFormat::Rgb | PixelFormat::Rgba => {
                let step = self.format.channels();
                self.data
                    .chunks_exact(step)
                    .map(|px| luma(px[0], px[1], px[2]))
                    .collect()
            }
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    // Integer Rec.601: (299 R + 587 G + 114 B) / 1000
    let y = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((y + 500) / 1000) as u8
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Bilinear sample at continuous pixel coordinates (pixel `i` spans `[i, i+1)`
/// and is addressed at integer `i`). Outside pixels read as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

/// Bilinear sample with edge clamping instead of black padding.
#[inline]
pub fn sample_bilinear_clamped(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    if src.width == 0 || src.height == 0 {
        return 0.0;
    }
    let max_x = (src.width - 1) as f32;
    let max_y = (src.height - 1) as f32;
    sample_bilinear(src, x.clamp(0.0, max_x), y.clamp(0.0, max_y))
}

/// Sample at a geometric position where pixel `i` covers `[i, i+1)`.
///
/// This is the convention used by every canonical/raw coordinate in the
/// pipeline; it shifts by half a pixel and clamps at the borders.
#[inline]
pub fn sample_point(src: &GrayImageView<'_>, p: Point2<f32>) -> f32 {
    sample_bilinear_clamped(src, p.x - 0.5, p.y - 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_image_rejects_wrong_buffer_length() {
        let err = RawImage::new(4, 3, PixelFormat::Rgb, vec![0; 35]).unwrap_err();
        assert_eq!(
            err,
            ImageError::BufferLength {
                expected: 36,
                got: 35
            }
        );
        assert!(matches!(
            RawImage::new(0, 3, PixelFormat::Gray, Vec::new()),
            Err(ImageError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn rgb_converts_to_luma() {
        let raw = RawImage::new(
            3,
            1,
            PixelFormat::Rgba,
            vec![255, 255, 255, 255, 0, 0, 0, 255, 255, 0, 0, 255],
        )
        .expect("valid buffer");
        let gray = raw.to_gray();
        assert_eq!(gray.data, vec![255, 0, 76]);
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage::from_vec(2, 1, vec![0, 200]).expect("image");
        let v = sample_bilinear(&img.view(), 0.25, 0.0);
        assert!((v - 50.0).abs() < 1e-4);
        assert_eq!(sample_bilinear_clamped(&img.view(), 5.0, 0.0), 200.0);
    }
}
