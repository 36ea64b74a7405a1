//! End-to-end engine tests with synthetic images and fake forward passes.

use burn_triage::{
    BoxError, CanonicalLabel, DecisionEngine, EngineConfig, EngineError, FinalLabel, LabelSet,
    ModelInput, PixelBuffer, RejectReason,
};
use burn_triage::preprocessing::View;
use image::{Rgb, RgbImage};

const PALE_SKIN: Rgb<u8> = Rgb([150, 140, 110]);
const BURN_RED: Rgb<u8> = Rgb([200, 130, 110]);
const SKY_BLUE: Rgb<u8> = Rgb([90, 120, 200]);

fn three_labels() -> LabelSet {
    LabelSet::parse("first\nsecond\nthird\n").unwrap()
}

fn engine_with(labels: LabelSet) -> DecisionEngine {
    DecisionEngine::new(labels, EngineConfig::default()).unwrap()
}

/// Skin background with a 100×100 burn-red square in the middle.
fn burn_image() -> PixelBuffer {
    let image = RgbImage::from_fn(224, 224, |x, y| {
        if (62..162).contains(&x) && (62..162).contains(&y) {
            BURN_RED
        } else {
            PALE_SKIN
        }
    });
    PixelBuffer::new(image).unwrap()
}

/// Lots of red on skin, split into many small separate patches.
fn speckled_image() -> PixelBuffer {
    let image = RgbImage::from_fn(224, 224, |x, y| {
        if (x % 32) >= 8 && (x % 32) < 24 && (y % 32) >= 8 && (y % 32) < 24 {
            BURN_RED
        } else {
            PALE_SKIN
        }
    });
    PixelBuffer::new(image).unwrap()
}

fn confident_first(_: &ModelInput) -> Result<Vec<f32>, BoxError> {
    Ok(vec![4.0, 0.0, 0.0])
}

#[test]
fn test_clear_burn_is_accepted() {
    let engine = engine_with(three_labels());
    let mut forward = confident_first;

    let result = engine.classify(&burn_image(), &mut forward).unwrap();

    assert_eq!(result.label, FinalLabel::Burn(CanonicalLabel::FirstDegree));
    assert_eq!(result.label.as_str(), "First-degree burn");
    assert_eq!(result.rejection, None);

    let d = &result.diagnostics;
    assert!(d.skin_fraction > 0.95, "skin {}", d.skin_fraction);
    assert!(d.red_on_skin_fraction > 0.12);
    assert!(d.largest_blob_fraction > 0.04);
    assert!(d.top > 0.82);
    assert!(d.jsd < 1e-6);
    assert_eq!(d.raw_label.as_deref(), Some("first"));
    assert!((d.canonical_probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
}

#[test]
fn test_repeated_classification_is_identical() {
    let engine = engine_with(three_labels());
    let buffer = burn_image();
    let mut forward = confident_first;

    let first = engine.classify(&buffer, &mut forward).unwrap();
    let second = engine.classify(&buffer, &mut forward).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_background_label_is_never_a_burn() {
    let labels = LabelSet::parse("Background\nfirst degree\nsecond degree\nthird degree").unwrap();
    let engine = engine_with(labels);
    let mut forward = |_: &ModelInput| -> Result<Vec<f32>, BoxError> { Ok(vec![6.0, 0.0, 0.0, 0.0]) };

    let result = engine.classify(&burn_image(), &mut forward).unwrap();
    assert_eq!(result.label, FinalLabel::NotDetected);
    assert_eq!(result.rejection, Some(RejectReason::UnmappedLabel));
    assert_eq!(result.diagnostics.raw_label.as_deref(), Some("Background"));
}

#[test]
fn test_text_labels_map_when_not_three() {
    let labels = LabelSet::parse("Background\nfirst degree\nsecond degree\nthird degree").unwrap();
    let engine = engine_with(labels);
    let mut forward = |_: &ModelInput| -> Result<Vec<f32>, BoxError> { Ok(vec![0.0, 0.0, 6.0, 0.0]) };

    let result = engine.classify(&burn_image(), &mut forward).unwrap();
    assert_eq!(result.label, FinalLabel::Burn(CanonicalLabel::SecondDegree));
}

#[test]
fn test_uniform_gap_follows_label_file_length() {
    // Two labels for a three-class model: the uniform baseline is 1/2
    let engine = engine_with(LabelSet::parse("first\nsecond\n").unwrap());
    let mut forward =
        |_: &ModelInput| -> Result<Vec<f32>, BoxError> { Ok(vec![-0.2107, -1.772, -3.912]) };

    let result = engine.classify(&burn_image(), &mut forward).unwrap();
    let d = &result.diagnostics;
    assert!((d.top - 0.81).abs() < 1e-3, "top {}", d.top);
    assert!((d.uniform_gap - (d.top - 0.5)).abs() < 1e-6);
    assert_eq!(result.rejection, Some(RejectReason::LowConfidence));
}

#[test]
fn test_no_skin_is_rejected() {
    let engine = engine_with(three_labels());
    let buffer = PixelBuffer::new(RgbImage::from_pixel(224, 224, SKY_BLUE)).unwrap();
    let mut forward = confident_first;

    let result = engine.classify(&buffer, &mut forward).unwrap();
    assert_eq!(result.label, FinalLabel::NotDetected);
    assert_eq!(result.rejection, Some(RejectReason::LowSkinFraction));
    assert_eq!(result.diagnostics.skin_fraction, 0.0);
}

#[test]
fn test_skin_bypass_moves_rejection_to_redness() {
    let config = EngineConfig {
        bypass_skin_check: true,
        ..EngineConfig::default()
    };
    let engine = DecisionEngine::new(three_labels(), config).unwrap();
    let buffer = PixelBuffer::new(RgbImage::from_pixel(224, 224, SKY_BLUE)).unwrap();
    let mut forward = confident_first;

    let result = engine.classify(&buffer, &mut forward).unwrap();
    assert_eq!(result.diagnostics.skin_fraction, 1.0);
    assert_eq!(result.rejection, Some(RejectReason::LowRedOnSkin));
}

#[test]
fn test_scattered_redness_is_a_small_lesion() {
    let engine = engine_with(three_labels());
    let mut forward = confident_first;

    let result = engine.classify(&speckled_image(), &mut forward).unwrap();
    let d = &result.diagnostics;
    assert!(d.red_on_skin_fraction > 0.12, "red {}", d.red_on_skin_fraction);
    assert!(d.largest_blob_fraction < 0.04, "blob {}", d.largest_blob_fraction);
    assert_eq!(result.rejection, Some(RejectReason::SmallLesion));
}

#[test]
fn test_uniform_logits_fail_entropy() {
    let engine = engine_with(three_labels());
    let mut forward = |_: &ModelInput| -> Result<Vec<f32>, BoxError> { Ok(vec![1.0, 1.0, 1.0]) };

    let result = engine.classify(&burn_image(), &mut forward).unwrap();
    assert_eq!(result.rejection, Some(RejectReason::HighEntropy));
    assert!((result.diagnostics.entropy - 3f32.ln()).abs() < 1e-4);
}

#[test]
fn test_disagreeing_views_are_rejected() {
    let engine = engine_with(three_labels());
    let mut forward = |input: &ModelInput| -> Result<Vec<f32>, BoxError> {
        Ok(match input.view {
            View::Original => vec![8.0, 0.0, 0.0],
            View::Mirrored => vec![2.0, 0.0, 0.0],
        })
    };

    let result = engine.classify(&burn_image(), &mut forward).unwrap();
    let d = &result.diagnostics;
    assert!(d.top > 0.82);
    assert!(d.jsd > 0.06, "jsd {}", d.jsd);
    assert_eq!(result.rejection, Some(RejectReason::InconsistentViews));
}

#[test]
fn test_six_forward_passes_per_request() {
    let engine = engine_with(three_labels());
    let mut calls = 0;
    let mut forward = |input: &ModelInput| -> Result<Vec<f32>, BoxError> {
        calls += 1;
        assert_eq!(input.tensor.shape(), &[1, 3, 224, 224]);
        Ok(vec![4.0, 0.0, 0.0])
    };

    engine.classify(&burn_image(), &mut forward).unwrap();
    assert_eq!(calls, 6);
}

#[test]
fn test_forward_failure_propagates() {
    let engine = engine_with(three_labels());
    let mut forward = |_: &ModelInput| -> Result<Vec<f32>, BoxError> { Err("session closed".into()) };

    let err = engine.classify(&burn_image(), &mut forward).unwrap_err();
    assert!(err.is_inference_failure());
    assert!(matches!(err, EngineError::Inference(_)));
}

#[test]
fn test_invalid_inputs_and_configuration() {
    assert!(matches!(
        PixelBuffer::new(RgbImage::new(0, 0)),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        PixelBuffer::from_raw(4, 4, vec![0; 10]),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        LabelSet::new(Vec::new()),
        Err(EngineError::Configuration(_))
    ));
}

#[test]
fn test_non_square_input_is_center_cropped() {
    // Burn square centred in a wide frame; the sides are cropped away for the model
    let image = RgbImage::from_fn(320, 224, |x, y| {
        if (110..210).contains(&x) && (62..162).contains(&y) {
            BURN_RED
        } else {
            PALE_SKIN
        }
    });
    let buffer = PixelBuffer::new(image).unwrap();
    let engine = engine_with(three_labels());
    let mut forward = |input: &ModelInput| -> Result<Vec<f32>, BoxError> {
        assert_eq!(input.tensor.shape(), &[1, 3, 224, 224]);
        Ok(vec![0.0, 4.0, 0.0])
    };

    let result = engine.classify(&buffer, &mut forward).unwrap();
    assert_eq!(result.label, FinalLabel::Burn(CanonicalLabel::SecondDegree));
}
