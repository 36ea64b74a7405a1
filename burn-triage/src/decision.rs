//! Decision engine: composes the colour, multi-view, statistical and label
//! stages into a final label plus an audit record.
//!
//! A request moves through `Init → ColorGated → MultiViewScored →
//! StatisticallyGated → Labeled` and ends `Accepted(label)` or `Rejected`.
//! There are no retries and nothing is kept between requests.

use crate::color_gate::{color_features, ColorFeatures};
use crate::decision_types::{DecisionThresholds, EngineConfig};
use crate::error::EngineResult;
use crate::labels::{canonicalize, CanonicalLabel, LabelSet};
use crate::multi_view::{aggregate, ForwardPass, MultiViewScores};
use crate::pixel_buffer::PixelBuffer;
use crate::preprocessing::{prepare_model_input, NormalizationScheme};
use crate::stat_gate::{GateResult, GateStats};
use serde::Serialize;
use std::fmt;

pub const NOT_DETECTED: &str = "Burn not detected";

/// Engine output label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalLabel {
    Burn(CanonicalLabel),
    NotDetected,
}

impl Serialize for FinalLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FinalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalLabel::Burn(label) => label.as_str(),
            FinalLabel::NotDetected => NOT_DETECTED,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, FinalLabel::Burn(_))
    }
}

impl fmt::Display for FinalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First gate that failed, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Top class is a non-burn label or maps to no canonical label.
    UnmappedLabel,
    LowSkinFraction,
    LowRedOnSkin,
    SmallLesion,
    HighEntropy,
    LowConfidence,
    InconsistentViews,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::UnmappedLabel => "top class is not a burn label",
            RejectReason::LowSkinFraction => "too little skin",
            RejectReason::LowRedOnSkin => "too little redness on skin",
            RejectReason::SmallLesion => "largest red region too small",
            RejectReason::HighEntropy => "prediction entropy too high",
            RejectReason::LowConfidence => "prediction not confident enough",
            RejectReason::InconsistentViews => "original and mirrored views disagree",
        };
        f.write_str(text)
    }
}

/// Every intermediate scalar of a request, regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub skin_fraction: f32,
    pub red_on_skin_fraction: f32,
    pub largest_blob_fraction: f32,
    pub entropy: f32,
    pub top_index: usize,
    pub top: f32,
    pub second: f32,
    pub margin: f32,
    pub uniform_gap: f32,
    pub jsd: f32,
    pub chosen_scheme: NormalizationScheme,
    pub chosen_scheme_index: usize,
    pub raw_label: Option<String>,
    pub final_label: FinalLabel,
    pub gates: GateResult,
    pub canonical_probs: Vec<f32>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let probs = self
            .canonical_probs
            .iter()
            .map(|p| format!("{p:.2}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "skin={:.3} redOnSkin={:.3} blobFrac={:.3} H={:.3} top={:.3} margin={:.3} \
             topOverUniform={:.3} JSD={:.3} raw={} -> {} | pickedProbs=[{}]",
            self.skin_fraction,
            self.red_on_skin_fraction,
            self.largest_blob_fraction,
            self.entropy,
            self.top,
            self.margin,
            self.uniform_gap,
            self.jsd,
            self.raw_label.as_deref().unwrap_or("null"),
            self.final_label,
            probs
        )
    }
}

/// Sole output of a classification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: FinalLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectReason>,
    pub diagnostics: Diagnostics,
}

/// Evaluate all gates in order; `Err` carries the first failure.
pub fn decide(
    color: &ColorFeatures,
    stats: &GateStats,
    label: Option<CanonicalLabel>,
    thresholds: &DecisionThresholds,
) -> Result<CanonicalLabel, RejectReason> {
    let label = label.ok_or(RejectReason::UnmappedLabel)?;

    if color.skin_fraction < thresholds.min_skin_fraction {
        return Err(RejectReason::LowSkinFraction);
    }
    if color.red_on_skin_fraction < thresholds.min_red_on_skin {
        return Err(RejectReason::LowRedOnSkin);
    }
    if color.largest_blob_fraction < thresholds.min_largest_blob_frac {
        return Err(RejectReason::SmallLesion);
    }

    let gate = stats.evaluate(thresholds);
    if !gate.entropy_ok {
        return Err(RejectReason::HighEntropy);
    }
    if !gate.confident() {
        return Err(RejectReason::LowConfidence);
    }
    if !gate.tta_consistent {
        return Err(RejectReason::InconsistentViews);
    }

    Ok(label)
}

/// Immutable engine holding the label list and configuration.
///
/// Safe to share across threads; each [`classify`](Self::classify) call owns
/// its intermediate state.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    labels: LabelSet,
    config: EngineConfig,
}

impl DecisionEngine {
    /// Validates the configuration; fails once here rather than per request.
    pub fn new(labels: LabelSet, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { labels, config })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Colour features as seen by the gate (skin forced to 1.0 when bypassed).
    pub fn color_stage(&self, buffer: &PixelBuffer) -> ColorFeatures {
        let mut color = color_features(buffer, self.config.analysis_size);
        if self.config.bypass_skin_check {
            color.skin_fraction = 1.0;
        }
        color
    }

    /// Run the full pipeline on one image.
    ///
    /// Errors are reserved for bad input and model failures; gate failures
    /// return a `Burn not detected` result.
    pub fn classify<F: ForwardPass + ?Sized>(
        &self,
        buffer: &PixelBuffer,
        forward: &mut F,
    ) -> EngineResult<ClassificationResult> {
        let color = self.color_stage(buffer);

        let model_input = prepare_model_input(buffer, self.config.input_size);
        let scores = aggregate(&model_input, forward)?;

        Ok(self.finish(color, &scores))
    }

    /// Statistical gate, labelling and decision for already-scored views.
    pub fn finish(&self, color: ColorFeatures, scores: &MultiViewScores) -> ClassificationResult {
        let stats = GateStats::compute(
            scores.canonical(),
            scores.original(),
            scores.mirrored(),
            self.labels.len(),
        );
        let raw_label = self.labels.get(stats.top2.top_index);
        let label = canonicalize(stats.top2.top_index, raw_label, self.labels.len());

        let outcome = decide(&color, &stats, label, &self.config.thresholds);
        let (final_label, rejection) = match outcome {
            Ok(label) => (FinalLabel::Burn(label), None),
            Err(reason) => (FinalLabel::NotDetected, Some(reason)),
        };

        let diagnostics = Diagnostics {
            skin_fraction: color.skin_fraction,
            red_on_skin_fraction: color.red_on_skin_fraction,
            largest_blob_fraction: color.largest_blob_fraction,
            entropy: stats.entropy,
            top_index: stats.top2.top_index,
            top: stats.top2.top,
            second: stats.top2.second,
            margin: stats.margin,
            uniform_gap: stats.uniform_gap,
            jsd: stats.jsd,
            chosen_scheme: scores.chosen_scheme(),
            chosen_scheme_index: scores.chosen,
            raw_label: raw_label.map(str::to_string),
            final_label,
            gates: stats.evaluate(&self.config.thresholds),
            canonical_probs: scores.canonical().to_vec(),
        };

        log::info!("{diagnostics}");
        if let Some(reason) = rejection {
            log::debug!("rejected: {reason}");
        }

        ClassificationResult {
            label: final_label,
            rejection,
            diagnostics,
        }
    }
}
