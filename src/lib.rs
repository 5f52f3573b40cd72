//! Webhook that runs object detection on a remote image and publishes the
//! per-label summary and an annotated copy to MQTT.

pub mod app;
pub mod error;
pub mod mqtt;
pub mod pipeline;

pub use error::{PipelineError, StartupError};
