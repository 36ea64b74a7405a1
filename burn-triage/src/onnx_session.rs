use crate::color_utils::symbols;
use crate::error::BoxError;
use crate::multi_view::{ForwardPass, ModelInput};
use anyhow::{Context, Result};
use log::Level;
use ort::{
    execution_providers::{CPUExecutionProvider, CoreMLExecutionProvider, ExecutionProvider},
    logging::LogLevel,
    session::Session,
    value::Value,
};
use std::fs;
use std::path::Path;

/// Calculate MD5 hash of bytes
pub fn calculate_md5_bytes(bytes: &[u8]) -> String {
    let mut hasher = md5::Context::new();
    hasher.consume(bytes);
    let result = hasher.compute();
    format!("{result:x}")
}

fn log_level_from_ort(level: LogLevel) -> Level {
    match level {
        LogLevel::Verbose => Level::Trace,
        LogLevel::Info => Level::Trace,
        LogLevel::Warning => Level::Debug,
        LogLevel::Error => Level::Info,
        LogLevel::Fatal => Level::Error,
    }
}

fn ort_level_from_log(level: Level) -> LogLevel {
    match level {
        // ONNX info output is closer to our trace
        Level::Trace => LogLevel::Verbose,
        Level::Debug => LogLevel::Warning,
        Level::Info => LogLevel::Error,
        Level::Warn => LogLevel::Error,
        Level::Error => LogLevel::Fatal,
    }
}

/// What was loaded, for logging
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub model_path: String,
    pub model_size_bytes: usize,
    pub model_checksum: String,
    pub execution_providers: Vec<String>,
}

/// Device selection result
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub device: String,
    pub reason: String,
}

/// Determine optimal device based on user preference
pub fn determine_optimal_device(requested_device: &str) -> DeviceSelection {
    match requested_device {
        "auto" => {
            let coreml = CoreMLExecutionProvider::default();
            match coreml.is_available() {
                Ok(true) => DeviceSelection {
                    device: "coreml".to_string(),
                    reason: "Auto-selected CoreML (available)".to_string(),
                },
                _ => DeviceSelection {
                    device: "cpu".to_string(),
                    reason: "Auto-selected CPU (CoreML not available)".to_string(),
                },
            }
        }
        other => DeviceSelection {
            device: other.to_string(),
            reason: format!("User explicitly chose {other}"),
        },
    }
}

/// ONNX Runtime classifier used as the engine's forward pass.
pub struct OnnxForwardPass {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OnnxForwardPass {
    /// Load a model file and build a session on the requested device.
    pub fn load(model_path: &Path, device: &str) -> Result<(Self, ModelInfo)> {
        let bytes = fs::read(model_path)
            .with_context(|| format!("Failed to read model file: {}", model_path.display()))?;
        let model_checksum = calculate_md5_bytes(&bytes);
        log::info!(
            "{}Loading model from {} ({} bytes, md5={model_checksum})",
            symbols::system_setup(),
            model_path.display(),
            bytes.len()
        );

        let selection = determine_optimal_device(device);
        log::debug!("Device: {} ({})", selection.device, selection.reason);

        let execution_providers = match selection.device.as_str() {
            "coreml" => match CoreMLExecutionProvider::default().is_available() {
                Ok(true) => vec![
                    CoreMLExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ],
                _ => {
                    log::warn!(
                        "{}CoreML not available, falling back to CPU",
                        symbols::warning()
                    );
                    vec![CPUExecutionProvider::default().build()]
                }
            },
            "cpu" => vec![CPUExecutionProvider::default().build()],
            other => {
                log::warn!("{}Unknown device '{other}', using CPU", symbols::warning());
                vec![CPUExecutionProvider::default().build()]
            }
        };
        let ep_names: Vec<String> = execution_providers
            .iter()
            .map(|ep| format!("{ep:?}"))
            .collect();

        // Pick the most verbose ORT level our logger will actually print
        let ort_log_level = [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
        ]
        .into_iter()
        .find(|&lvl| log::log_enabled!(lvl))
        .map(ort_level_from_log)
        .unwrap_or(LogLevel::Fatal);

        let session = Session::builder()
            .map_err(|e| anyhow::anyhow!("Failed to create session builder: {}", e))?
            .with_logger(Box::new(|level, _, _, _, msg| {
                log::log!(log_level_from_ort(level), "[onnx] {msg}")
            }))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?
            .with_log_level(ort_log_level)
            .map_err(|e| anyhow::anyhow!("Failed to set log level: {}", e))?
            .with_execution_providers(execution_providers)
            .map_err(|e| anyhow::anyhow!("Failed to set execution providers: {}", e))?
            .commit_from_memory(&bytes)
            .map_err(|e| anyhow::anyhow!("Failed to load ONNX model: {}", e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow::anyhow!("Model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| anyhow::anyhow!("Model has no outputs"))?;

        log::debug!(
            "{} Execution providers registered: {}",
            symbols::system_setup(),
            ep_names.join(" -> ")
        );

        let info = ModelInfo {
            model_path: model_path.display().to_string(),
            model_size_bytes: bytes.len(),
            model_checksum,
            execution_providers: ep_names,
        };

        Ok((
            Self {
                session,
                input_name,
                output_name,
            },
            info,
        ))
    }
}

impl ForwardPass for OnnxForwardPass {
    fn forward(&mut self, input: &ModelInput) -> Result<Vec<f32>, BoxError> {
        let input_value = Value::from_array(input.tensor.clone())?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => &input_value])?;
        let logits = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        Ok(logits.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_of_known_bytes() {
        assert_eq!(calculate_md5_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            calculate_md5_bytes(b"burn_cpu_v1"),
            calculate_md5_bytes(b"burn_cpu_v1")
        );
    }

    #[test]
    fn test_explicit_device_is_respected() {
        let selection = determine_optimal_device("cpu");
        assert_eq!(selection.device, "cpu");
        assert!(selection.reason.contains("explicitly"));
    }

    #[test]
    fn test_log_level_mapping_is_quieter_than_ort() {
        assert_eq!(log_level_from_ort(LogLevel::Info), Level::Trace);
        assert_eq!(ort_level_from_log(Level::Info), LogLevel::Error);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let result = OnnxForwardPass::load(Path::new("/no/such/model.onnx"), "cpu");
        let err = result.err().expect("missing model must fail");
        assert!(format!("{err}").contains("Failed to read model file"));
    }
}
