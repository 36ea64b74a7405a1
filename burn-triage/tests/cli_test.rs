use image::{Rgb, RgbImage};
use std::process::{Command, Output};
use tempfile::TempDir;

fn burn_triage(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_burn-triage"))
        .args(args)
        .env_remove("BURN_TRIAGE_MODEL_PATH")
        .env_remove("BURN_TRIAGE_LABELS_PATH")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute burn-triage")
}

fn write_inputs(dir: &TempDir) -> (String, String) {
    let image = dir.path().join("arm.png");
    RgbImage::from_pixel(64, 48, Rgb([150, 140, 110]))
        .save(&image)
        .unwrap();
    let labels = dir.path().join("labels.txt");
    std::fs::write(&labels, "first\nsecond\nthird\n").unwrap();
    (
        image.to_string_lossy().to_string(),
        labels.to_string_lossy().to_string(),
    )
}

#[test]
fn test_thresholds_prints_default_toml() {
    let output = burn_triage(&["thresholds"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[thresholds]"), "got: {stdout}");
    assert!(stdout.contains("accept_hard = "), "got: {stdout}");
    assert!(stdout.contains("analysis_size = 128"), "got: {stdout}");
}

#[test]
fn test_version() {
    let output = burn_triage(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("burn-triage v"));
}

#[test]
fn test_classify_without_model_fails() {
    let dir = TempDir::new().unwrap();
    let (image, labels) = write_inputs(&dir);

    let output = burn_triage(&["classify", &image, "--labels", &labels]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No model given"), "got: {stderr}");
}

#[test]
fn test_classify_with_missing_model_file_fails() {
    let dir = TempDir::new().unwrap();
    let (image, labels) = write_inputs(&dir);

    let output = burn_triage(&[
        "classify",
        &image,
        "--labels",
        &labels,
        "--model-path",
        "/non/existent/model.onnx",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to read model file"),
        "Error should mention the model file, got: {stderr}"
    );
}

#[test]
fn test_classify_missing_image_in_strict_mode() {
    let dir = TempDir::new().unwrap();
    let (_, labels) = write_inputs(&dir);

    let output = burn_triage(&[
        "classify",
        "/no/such/arm.jpg",
        "--labels",
        &labels,
        "--model-path",
        "model.onnx",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File does not exist"), "got: {stderr}");
}

#[test]
fn test_unknown_threshold_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (image, labels) = write_inputs(&dir);
    let thresholds = dir.path().join("t.toml");
    std::fs::write(&thresholds, "[thresholds]\naccept_soft = 0.5\n").unwrap();

    let output = burn_triage(&[
        "classify",
        &image,
        "--labels",
        &labels,
        "--model-path",
        "model.onnx",
        "--thresholds",
        thresholds.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration"), "got: {stderr}");
}
