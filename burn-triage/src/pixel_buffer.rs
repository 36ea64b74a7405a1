//! Immutable RGB pixel buffer handed to the engine by the caller.

use crate::error::{EngineError, EngineResult};
use image::RgbImage;
use std::path::Path;

/// Decoded 8-bit RGB image. The engine only reads it and derives scaled copies.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbImage,
}

impl PixelBuffer {
    /// Wrap an already decoded image, rejecting zero-sized buffers.
    pub fn new(image: RgbImage) -> EngineResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::invalid_input(format!(
                "pixel buffer has zero size ({width}x{height})"
            )));
        }
        Ok(Self { image })
    }

    /// Build a buffer from packed RGB bytes in row-major order.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> EngineResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| {
                EngineError::invalid_input(format!("{width}x{height} RGB buffer is too large"))
            })?;
        if data.len() != expected {
            return Err(EngineError::invalid_input(format!(
                "expected {expected} bytes for {width}x{height} RGB, got {}",
                data.len()
            )));
        }
        let image = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            EngineError::invalid_input(format!("cannot build {width}x{height} RGB buffer"))
        })?;
        Self::new(image)
    }

    /// Decode an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            EngineError::invalid_input(format!("failed to decode {}: {e}", path.display()))
        })?;
        Self::new(decoded.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}
