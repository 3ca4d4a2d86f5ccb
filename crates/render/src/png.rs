//! PNG encoding of rendered tiles and decoding for the combiner.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::RenderError;

/// Encode a row-major RGBA buffer as PNG bytes.
pub fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, RenderError> {
    let actual = rgba.len();
    let image = RgbaImage::from_raw(width, height, rgba).ok_or(RenderError::BufferSize {
        width,
        height,
        expected: width as usize * height as usize * 4,
        actual,
    })?;

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Decode PNG bytes into an RGBA image, converting other colour types.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, RenderError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    Ok(image.into_rgba8())
}
