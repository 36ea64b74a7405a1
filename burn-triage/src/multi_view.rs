//! Test-time augmentation across mirrored views and normalization schemes.
//!
//! Every request runs six forward passes (2 views × 3 schemes). For each
//! scheme the two views are averaged; the average with the highest peak
//! becomes the canonical distribution.

use crate::error::{BoxError, EngineResult, InferenceError};
use crate::preprocessing::{mirror_horizontal, to_nchw_tensor, NormalizationScheme, View};
use image::RgbImage;
use ndarray::Array4;

/// One model invocation: the normalized tensor plus how it was produced.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// `[1, 3, H, W]` tensor already normalized with `scheme`.
    pub tensor: Array4<f32>,
    pub scheme: NormalizationScheme,
    pub view: View,
}

impl ModelInput {
    pub fn mean(&self) -> [f32; 3] {
        self.scheme.mean()
    }

    pub fn std(&self) -> [f32; 3] {
        self.scheme.std()
    }
}

/// Model capability injected into the engine: tensor in, class logits out.
pub trait ForwardPass {
    fn forward(&mut self, input: &ModelInput) -> Result<Vec<f32>, BoxError>;
}

impl<F> ForwardPass for F
where
    F: FnMut(&ModelInput) -> Result<Vec<f32>, BoxError>,
{
    fn forward(&mut self, input: &ModelInput) -> Result<Vec<f32>, BoxError> {
        self(input)
    }
}

/// Softmax with the max logit subtracted before exponentiating.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits.iter().map(|&l| ((l - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| (e / sum) as f32).collect()
}

/// Elementwise mean of two distributions.
pub fn average(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(&x, &y)| 0.5 * (x + y)).collect()
}

fn peak(probs: &[f32]) -> f32 {
    probs.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Per-scheme probabilities for both views.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeScores {
    pub scheme: NormalizationScheme,
    pub original: Vec<f32>,
    pub mirrored: Vec<f32>,
    pub averaged: Vec<f32>,
}

/// Aggregated output of the six forward passes.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiViewScores {
    /// Scores in [`NormalizationScheme::ALL`] order.
    pub per_scheme: Vec<SchemeScores>,
    /// Index into `per_scheme` of the canonical distribution.
    pub chosen: usize,
}

impl MultiViewScores {
    fn chosen_scores(&self) -> &SchemeScores {
        &self.per_scheme[self.chosen]
    }

    pub fn canonical(&self) -> &[f32] {
        &self.chosen_scores().averaged
    }

    pub fn original(&self) -> &[f32] {
        &self.chosen_scores().original
    }

    pub fn mirrored(&self) -> &[f32] {
        &self.chosen_scores().mirrored
    }

    pub fn chosen_scheme(&self) -> NormalizationScheme {
        self.chosen_scores().scheme
    }

    pub fn num_classes(&self) -> usize {
        self.canonical().len()
    }
}

/// Run one forward pass and turn its logits into probabilities.
fn score_view<F: ForwardPass + ?Sized>(
    forward: &mut F,
    image: &RgbImage,
    view: View,
    scheme: NormalizationScheme,
    expected_len: Option<usize>,
) -> EngineResult<Vec<f32>> {
    let input = ModelInput {
        tensor: to_nchw_tensor(image, scheme),
        scheme,
        view,
    };

    let logits = forward
        .forward(&input)
        .map_err(|source| InferenceError::ForwardPass {
            view,
            scheme,
            source,
        })?;

    let malformed = |detail: String| InferenceError::MalformedLogits {
        view,
        scheme,
        detail,
    };
    if logits.is_empty() {
        return Err(malformed("no logits returned".to_string()).into());
    }
    if let Some(bad) = logits.iter().position(|l| !l.is_finite()) {
        return Err(malformed(format!("logit {bad} is {}", logits[bad])).into());
    }
    if let Some(expected) = expected_len {
        if logits.len() != expected {
            return Err(malformed(format!(
                "expected {expected} logits, got {}",
                logits.len()
            ))
            .into());
        }
    }

    let probs = softmax(&logits);
    log::debug!("{view}/{scheme}: logits={logits:?} probs={probs:?}");
    Ok(probs)
}

/// Score `model_input` (already cropped and resized) under every view and scheme.
pub fn aggregate<F: ForwardPass + ?Sized>(
    model_input: &RgbImage,
    forward: &mut F,
) -> EngineResult<MultiViewScores> {
    let mirrored_input = mirror_horizontal(model_input);
    let mut num_classes = None;
    let mut per_scheme = Vec::with_capacity(NormalizationScheme::ALL.len());

    for scheme in NormalizationScheme::ALL {
        let original = score_view(forward, model_input, View::Original, scheme, num_classes)?;
        num_classes = Some(original.len());
        let mirrored = score_view(forward, &mirrored_input, View::Mirrored, scheme, num_classes)?;
        let averaged = average(&original, &mirrored);
        per_scheme.push(SchemeScores {
            scheme,
            original,
            mirrored,
            averaged,
        });
    }

    let mut chosen = 0;
    for (i, scores) in per_scheme.iter().enumerate().skip(1) {
        if peak(&scores.averaged) > peak(&per_scheme[chosen].averaged) {
            chosen = i;
        }
    }

    log::debug!(
        "picked {} normalization (peak {:.3})",
        per_scheme[chosen].scheme,
        peak(&per_scheme[chosen].averaged)
    );

    Ok(MultiViewScores { per_scheme, chosen })
}
