//! Separation between CLI arguments and the internal classify configuration.
//!
//! `GlobalArgs` and `ClassifyCommand` are clap structs; `ClassifyConfig` is
//! what `classify_processing` runs on, with paths resolved and the engine
//! configuration loaded.

use crate::decision_types::EngineConfig;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use std::path::{Path, PathBuf};

pub const MODEL_PATH_ENV: &str = "BURN_TRIAGE_MODEL_PATH";
pub const LABELS_PATH_ENV: &str = "BURN_TRIAGE_LABELS_PATH";
/// Label file looked up next to the model when no path is given.
pub const DEFAULT_LABELS_FILE: &str = "labels.txt";

/// Global CLI arguments that apply to all commands
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Use permissive mode for input validation (warn instead of error for unsupported files)
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Device to use for inference (auto, cpu, coreml)
    #[arg(long, default_value = "auto", global = true)]
    pub device: String,

    /// Disable colored output (also respects NO_COLOR and BURN_TRIAGE_NO_COLOR env vars)
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI command for burn classification
#[derive(Parser, Debug, Clone)]
pub struct ClassifyCommand {
    /// Path(s) to input images or directories. Supports glob patterns like *.jpg
    #[arg(value_name = "IMAGES_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Path to the ONNX classifier (falls back to BURN_TRIAGE_MODEL_PATH)
    #[arg(long)]
    pub model_path: Option<String>,

    /// Path to the label file, one class per line
    /// (falls back to BURN_TRIAGE_LABELS_PATH, then labels.txt next to the model)
    #[arg(long)]
    pub labels: Option<String>,

    /// TOML file overriding decision thresholds
    #[arg(long, value_name = "FILE")]
    pub thresholds: Option<String>,

    /// Print one JSON object per image instead of `path: label`
    #[arg(long)]
    pub json: bool,

    #[arg(long, hide = true)]
    pub debug_bypass_skin_check: bool,
}

/// Internal configuration for a classify run
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub sources: Vec<String>,
    pub device: String,
    /// Fail on missing/unsupported inputs and on the first failed image. Opposite of `--permissive`.
    pub strict: bool,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub json: bool,
    pub engine: EngineConfig,
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Flag value first, then the environment variable.
pub fn resolve_path(flag: Option<&str>, env_name: &str) -> Option<PathBuf> {
    flag.map(PathBuf::from).or_else(|| env_path(env_name))
}

pub fn default_labels_path(model_path: &Path) -> PathBuf {
    model_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_LABELS_FILE)
}

impl ClassifyConfig {
    /// Create configuration from global args and command-specific args
    pub fn from_args(global: GlobalArgs, cmd: ClassifyCommand) -> Result<Self, String> {
        let model_path = resolve_path(cmd.model_path.as_deref(), MODEL_PATH_ENV).ok_or_else(
            || format!("No model given. Pass --model-path or set {MODEL_PATH_ENV}."),
        )?;
        let labels_path = resolve_path(cmd.labels.as_deref(), LABELS_PATH_ENV)
            .unwrap_or_else(|| default_labels_path(&model_path));

        let mut engine = match &cmd.thresholds {
            Some(path) => EngineConfig::from_toml_file(path).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        if cmd.debug_bypass_skin_check {
            engine.bypass_skin_check = true;
        }

        Ok(Self {
            sources: cmd.sources,
            device: global.device,
            strict: !global.permissive,
            model_path,
            labels_path,
            json: cmd.json,
            engine,
        })
    }
}
