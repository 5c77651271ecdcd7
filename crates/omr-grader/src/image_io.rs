//! Bridges to the `image` crate: decoding uploads and writing fixtures.

use ::image::{DynamicImage, ImageReader};
use omr_core::{GrayImage, GrayImageView, ImageError, PixelFormat, RawImage};
use std::io::Cursor;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ImageIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] ::image::ImageError),
    #[error(transparent)]
    Buffer(#[from] ImageError),
}

/// Decode a PNG/JPEG/... file into a [`RawImage`].
pub fn load_raw_image(path: impl AsRef<Path>) -> Result<RawImage, ImageIoError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    from_dynamic(img)
}

/// Decode encoded image bytes, guessing the format from the content.
pub fn decode_raw_image(bytes: &[u8]) -> Result<RawImage, ImageIoError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    from_dynamic(img)
}

/// Keep 8-bit gray, RGB and RGBA as they are; convert everything else to RGB.
pub fn from_dynamic(img: DynamicImage) -> Result<RawImage, ImageIoError> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = match img {
        DynamicImage::ImageLuma8(buf) => RawImage::new(w, h, PixelFormat::Gray, buf.into_raw())?,
        DynamicImage::ImageRgba8(buf) => RawImage::new(w, h, PixelFormat::Rgba, buf.into_raw())?,
        other => RawImage::new(w, h, PixelFormat::Rgb, other.into_rgb8().into_raw())?,
    };
    Ok(raw)
}

/// Borrow an `image::GrayImage` as the lightweight view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Write a gray buffer as an image file; the format follows the extension.
pub fn save_gray(img: &GrayImage, path: impl AsRef<Path>) -> Result<(), ImageIoError> {
    let buf = ::image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(ImageError::BufferLength {
            expected: img.width * img.height,
            got: img.data.len(),
        })?;
    buf.save(path)?;
    Ok(())
}
