use crate::pixel_buffer::PixelBuffer;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use serde::Serialize;
use std::fmt;

/// Side of the square model input.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Geometric test-time view of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Original,
    Mirrored,
}

impl View {
    pub const ALL: [View; 2] = [View::Original, View::Mirrored];
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Original => write!(f, "orig"),
            View::Mirrored => write!(f, "flip"),
        }
    }
}

/// Per-channel normalization applied when a view becomes a tensor.
///
/// The model's training-time normalization is not known for certain, so every
/// request is scored under all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationScheme {
    /// torchvision ImageNet mean/std.
    ImageNet,
    /// Mean 0, std 1: raw [0,1] pixels.
    Identity,
    /// Mean 0.5, std 0.5: pixels mapped to [-1,1].
    Symmetric,
}

impl NormalizationScheme {
    /// Scheme order; a scheme's position here is its reported index.
    pub const ALL: [NormalizationScheme; 3] = [
        NormalizationScheme::ImageNet,
        NormalizationScheme::Identity,
        NormalizationScheme::Symmetric,
    ];

    pub fn mean(&self) -> [f32; 3] {
        match self {
            NormalizationScheme::ImageNet => IMAGENET_MEAN,
            NormalizationScheme::Identity => [0.0; 3],
            NormalizationScheme::Symmetric => [0.5; 3],
        }
    }

    pub fn std(&self) -> [f32; 3] {
        match self {
            NormalizationScheme::ImageNet => IMAGENET_STD,
            NormalizationScheme::Identity => [1.0; 3],
            NormalizationScheme::Symmetric => [0.5; 3],
        }
    }

    pub fn index(&self) -> usize {
        match self {
            NormalizationScheme::ImageNet => 0,
            NormalizationScheme::Identity => 1,
            NormalizationScheme::Symmetric => 2,
        }
    }
}

impl fmt::Display for NormalizationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationScheme::ImageNet => write!(f, "imagenet"),
            NormalizationScheme::Identity => write!(f, "identity"),
            NormalizationScheme::Symmetric => write!(f, "symmetric"),
        }
    }
}

/// Largest centered square of the image.
pub fn center_crop_square(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    image::imageops::crop_imm(image, x, y, side, side).to_image()
}

/// Center crop then bilinear resize to the model input size.
pub fn prepare_model_input(buffer: &PixelBuffer, size: u32) -> RgbImage {
    let square = center_crop_square(buffer.as_image());
    if square.dimensions() == (size, size) {
        return square;
    }
    image::imageops::resize(&square, size, size, FilterType::Triangle)
}

pub fn mirror_horizontal(image: &RgbImage) -> RgbImage {
    image::imageops::flip_horizontal(image)
}

/// NCHW float tensor `[1, 3, H, W]` with `(pixel / 255 - mean) / std` per channel.
pub fn to_nchw_tensor(image: &RgbImage, scheme: NormalizationScheme) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mean = scheme.mean();
    let std = scheme.std();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - mean[c]) / std[c];
        }
    }
    tensor
}
