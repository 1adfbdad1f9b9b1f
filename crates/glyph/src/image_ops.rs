//! Decoding and normalization of rasterizer output.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, imageops::FilterType};

use crate::error::{Error, Result};

/// Telegram rejects photos above 10 MB.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Telegram requires width + height of a photo to stay within 10000 px.
pub const MAX_PHOTO_SIDE_SUM: u32 = 10_000;

/// A PNG-encoded image together with its final geometry.
#[derive(Debug)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub was_resized: bool,
}

/// Decode `data`, shrink it to fit `max_dimension` and re-encode as PNG.
///
/// PNG is kept even for opaque images: glyphs are mostly flat color with
/// hard edges, which JPEG blurs.
pub fn normalize_png(data: &[u8], max_dimension: u32) -> Result<NormalizedImage> {
    if max_dimension == 0 {
        return Err(Error::invalid_input("max_dimension must be positive"));
    }

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::external("failed to guess image format", e))?
        .decode()
        .map_err(|e| Error::external("failed to decode image", e))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::invalid_input("rasterizer returned an empty image"));
    }

    let limit = max_dimension.min(MAX_PHOTO_SIDE_SUM / 2);
    let (img, was_resized) = resize_to_fit(img, limit);
    let (width, height) = img.dimensions();

    let mut output = Cursor::new(Vec::new());
    img.write_to(&mut output, ImageFormat::Png)
        .map_err(|e| Error::external("failed to encode PNG", e))?;
    let data = output.into_inner();

    if data.len() > MAX_PHOTO_BYTES {
        return Err(Error::invalid_input(format!(
            "rendered image is {} bytes, above the {MAX_PHOTO_BYTES} byte photo limit",
            data.len()
        )));
    }

    Ok(NormalizedImage {
        data,
        width,
        height,
        was_resized,
    })
}

fn resize_to_fit(img: DynamicImage, max_dimension: u32) -> (DynamicImage, bool) {
    let (width, height) = img.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return (img, false);
    }

    let ratio = f64::from(max_dimension) / f64::from(width.max(height));
    let new_width = ((f64::from(width) * ratio).round() as u32).max(1);
    let new_height = ((f64::from(height) * ratio).round() as u32).max(1);
    (img.resize_exact(new_width, new_height, FilterType::Lanczos3), true)
}
