// SignSpeak Engine - gesture pipeline for a sensor glove
// Text lines in, stabilized gestures and localized sentences out

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod ingest;
pub mod sample;
pub mod telemetry;
pub mod transport;

// Re-exports for convenience
pub use config::AppConfig;
pub use dispatch::{DispatchOutput, Dispatcher, Enhancer};
pub use engine::{GesturePipeline, PollReport, SampleView};
pub use error::{ConfigError, EnhanceError, ErrorCode, ParseError, PipelineError};
pub use ingest::IngestAdapter;
pub use sample::{CanonicalSample, SampleStore, Vec3};
pub use telemetry::{PipelineEvent, TelemetryHub};
