//! Confidence statistics over the canonical distribution and mirror consistency.

use crate::decision_types::DecisionThresholds;
use crate::labels::CANONICAL_COUNT;
use serde::Serialize;

/// Probabilities at or below this contribute nothing to entropy or KL terms.
const PROB_EPSILON: f32 = 1e-8;

/// Top two probabilities of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Top2Stats {
    pub top_index: usize,
    pub top: f32,
    pub second: f32,
}

impl Top2Stats {
    /// Forward scan that only replaces the leader on a strict `>`, so the
    /// first index holding the maximum wins.
    pub fn from_probs(probs: &[f32]) -> Self {
        let Some((&first, rest)) = probs.split_first() else {
            return Self {
                top_index: 0,
                top: 0.0,
                second: 0.0,
            };
        };

        let mut stats = Self {
            top_index: 0,
            top: first,
            second: 0.0,
        };
        for (offset, &p) in rest.iter().enumerate() {
            if p > stats.top {
                stats.second = stats.top;
                stats.top = p;
                stats.top_index = offset + 1;
            } else if p > stats.second {
                stats.second = p;
            }
        }
        stats
    }

    pub fn margin(&self) -> f32 {
        self.top - self.second
    }
}

/// Shannon entropy in nats.
pub fn entropy(probs: &[f32]) -> f32 {
    let h: f64 = probs
        .iter()
        .filter(|&&p| p > PROB_EPSILON)
        .map(|&p| -(p as f64) * (p as f64).ln())
        .sum();
    h as f32
}

/// KL(a‖b) summed over indices where both entries exceed the epsilon.
fn kl_divergence(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|&(&ai, &bi)| ai > PROB_EPSILON && bi > PROB_EPSILON)
        .map(|(&ai, &bi)| ai as f64 * (ai as f64 / bi as f64).ln())
        .sum()
}

/// Jensen–Shannon divergence in nats, bounded by ln 2.
pub fn js_divergence(p: &[f32], q: &[f32]) -> f32 {
    let m: Vec<f32> = p.iter().zip(q).map(|(&pi, &qi)| 0.5 * (pi + qi)).collect();
    (0.5 * kl_divergence(p, &m) + 0.5 * kl_divergence(q, &m)) as f32
}

/// Scalars the statistical gate decides on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateStats {
    pub entropy: f32,
    pub top2: Top2Stats,
    pub margin: f32,
    /// Top probability minus `1 / num_labels`.
    pub uniform_gap: f32,
    /// Divergence between the two views of the chosen scheme.
    pub jsd: f32,
}

impl GateStats {
    /// `num_labels` is the label-file length, independent of the model's
    /// class count; zero falls back to [`CANONICAL_COUNT`].
    pub fn compute(
        canonical: &[f32],
        original: &[f32],
        mirrored: &[f32],
        num_labels: usize,
    ) -> Self {
        let top2 = Top2Stats::from_probs(canonical);
        let denominator = if num_labels == 0 {
            CANONICAL_COUNT
        } else {
            num_labels
        };
        let uniform = 1.0 / denominator as f32;
        Self {
            entropy: entropy(canonical),
            top2,
            margin: top2.margin(),
            uniform_gap: top2.top - uniform,
            jsd: js_divergence(original, mirrored),
        }
    }

    pub fn evaluate(&self, thresholds: &DecisionThresholds) -> GateResult {
        GateResult {
            entropy_ok: self.entropy <= thresholds.max_entropy,
            accept_direct: self.top2.top >= thresholds.accept_hard,
            accept_by_rule: self.top2.top >= thresholds.min_confidence
                && self.margin >= thresholds.min_margin
                && self.uniform_gap >= thresholds.uniform_gap,
            tta_consistent: self.jsd <= thresholds.max_jsd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub entropy_ok: bool,
    pub accept_direct: bool,
    pub accept_by_rule: bool,
    pub tta_consistent: bool,
}

impl GateResult {
    pub fn confident(&self) -> bool {
        self.accept_direct || self.accept_by_rule
    }
}
