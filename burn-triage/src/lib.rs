pub mod blob_analysis;
pub mod classify_processing;
pub mod color_gate;
pub mod color_utils;
pub mod config;
pub mod decision;
pub mod decision_types;
pub mod error;
pub mod image_input;
pub mod labels;
pub mod multi_view;
pub mod onnx_session;
pub mod pixel_buffer;
pub mod preprocessing;
pub mod stat_gate;

pub use decision::{ClassificationResult, DecisionEngine, Diagnostics, FinalLabel, RejectReason};
pub use decision_types::{DecisionThresholds, EngineConfig};
pub use error::{BoxError, EngineError, EngineResult, InferenceError};
pub use labels::{CanonicalLabel, LabelSet};
pub use multi_view::{ForwardPass, ModelInput};
pub use pixel_buffer::PixelBuffer;
