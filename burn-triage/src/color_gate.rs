//! Skin and redness heuristics in YCbCr space.
//!
//! These fractions are a rejection gate only; they never pick the burn degree.

use crate::blob_analysis::largest_component_fraction;
use crate::pixel_buffer::PixelBuffer;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use serde::Serialize;

/// Side of the square grid the colour statistics are computed on.
pub const DEFAULT_ANALYSIS_SIZE: u32 = 128;

const CR_SKIN: std::ops::RangeInclusive<i32> = 133..=173;
const CB_SKIN: std::ops::RangeInclusive<i32> = 77..=127;
const RED_DOMINANCE: i32 = 18;
const RED_FLOOR: i32 = 90;

/// Colour evidence that the image shows inflamed skin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorFeatures {
    /// Fraction of sampled pixels classified as skin.
    pub skin_fraction: f32,
    /// Fraction of skin pixels that are also red (0 when there is no skin).
    pub red_on_skin_fraction: f32,
    /// Largest connected red-on-skin region as a fraction of all sampled pixels.
    pub largest_blob_fraction: f32,
}

/// Boolean red-on-skin mask in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RednessMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl RednessMask {
    /// All-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let i = self.index(x, y);
        self.bits[i] = value;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Output of [`analyze`]: the two global fractions plus the mask for blob analysis.
#[derive(Debug, Clone)]
pub struct ColorAnalysis {
    pub skin_fraction: f32,
    pub red_on_skin_fraction: f32,
    pub mask: RednessMask,
}

/// BT.601 YCbCr with every component truncated to an integer.
pub fn rgb_to_ycbcr(pixel: Rgb<u8>) -> (i32, i32, i32) {
    let [r, g, b] = pixel.0.map(i32::from);
    let y = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) as i32;
    let cb = ((b - y) as f64 * 0.564 + 128.0) as i32;
    let cr = ((r - y) as f64 * 0.713 + 128.0) as i32;
    (y, cb, cr)
}

pub fn is_skin(pixel: Rgb<u8>) -> bool {
    let (_, cb, cr) = rgb_to_ycbcr(pixel);
    CR_SKIN.contains(&cr) && CB_SKIN.contains(&cb)
}

/// Red test, applied only to pixels already classified as skin.
pub fn is_red(pixel: Rgb<u8>) -> bool {
    let [r, g, b] = pixel.0.map(i32::from);
    r > g + RED_DOMINANCE && r > b + RED_DOMINANCE && r > RED_FLOOR
}

/// Bilinear downsample to `size`×`size`; already-sized images are used as is.
pub fn downsample(image: &RgbImage, size: u32) -> RgbImage {
    if image.dimensions() == (size, size) {
        image.clone()
    } else {
        image::imageops::resize(image, size, size, FilterType::Triangle)
    }
}

/// Skin and red-on-skin fractions of the buffer at the analysis resolution.
pub fn analyze(buffer: &PixelBuffer, analysis_size: u32) -> ColorAnalysis {
    let scaled = downsample(buffer.as_image(), analysis_size);
    let (width, height) = scaled.dimensions();
    let total = width as usize * height as usize;

    let mut mask = RednessMask::new(width, height);
    let mut skin_count = 0usize;
    let mut red_on_skin_count = 0usize;

    for (x, y, &pixel) in scaled.enumerate_pixels() {
        if !is_skin(pixel) {
            continue;
        }
        skin_count += 1;
        if is_red(pixel) {
            mask.set(x, y, true);
            red_on_skin_count += 1;
        }
    }

    let skin_fraction = if total > 0 {
        skin_count as f32 / total as f32
    } else {
        0.0
    };
    let red_on_skin_fraction = if skin_count > 0 {
        red_on_skin_count as f32 / skin_count as f32
    } else {
        0.0
    };

    log::trace!(
        "colour gate: {skin_count} skin / {red_on_skin_count} red-on-skin of {total} pixels"
    );

    ColorAnalysis {
        skin_fraction,
        red_on_skin_fraction,
        mask,
    }
}

/// Full colour feature bundle: [`analyze`] followed by blob analysis of its mask.
pub fn color_features(buffer: &PixelBuffer, analysis_size: u32) -> ColorFeatures {
    let analysis = analyze(buffer, analysis_size);
    ColorFeatures {
        skin_fraction: analysis.skin_fraction,
        red_on_skin_fraction: analysis.red_on_skin_fraction,
        largest_blob_fraction: largest_component_fraction(&analysis.mask),
    }
}
