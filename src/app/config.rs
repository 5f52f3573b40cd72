use std::env;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder};

use crate::error::StartupError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: Server,
    pub mqtt: MQTTConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MQTTConfig {
    pub host: String,
    pub port: u16,
    pub topic_results: String,
    pub topic_image: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub qos: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub threshold: f32,
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    #[serde(default)]
    pub model_filename: String,
    #[serde(default)]
    pub label_filename: String,
    #[serde(default = "default_num_threads")]
    pub num_threads: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    pub font_filename: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_classes() -> Vec<String> {
    vec!["person".to_string()]
}

fn default_num_threads() -> u8 {
    1
}

/// Flat variables used by the original container deployment, mapped onto
/// their config keys. These take precedence over everything else.
const LEGACY_ENV: [(&str, &str); 6] = [
    ("MQTT_BROKER_HOST", "mqtt.host"),
    ("MQTT_BROKER_PORT", "mqtt.port"),
    ("MQTT_TOPIC_RESULTS", "mqtt.topic_results"),
    ("MQTT_TOPIC_IMAGE", "mqtt.topic_image"),
    ("MODELCONF", "model.threshold"),
    ("FLASK_PORT", "server.port"),
];

impl fmt::Display for MQTTConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "mqtt tcp://{}:{}, results -> {}, image -> {}, qos {}",
            self.host, self.port, self.topic_results, self.topic_image, self.qos
        )
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "model {}, threshold {}, classes [{}], {} threads",
            self.model_filename,
            self.threshold,
            self.classes.join(","),
            self.num_threads
        )
    }
}

impl AppConfig {
    /// Reads `path` if it exists, then `YOLOHOOK_*` variables, then the
    /// legacy flat variables.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let mut builder = Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("YOLOHOOK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("model.classes"),
            );
        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, env::var(var).ok())?;
        }
        Self::build(builder)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, StartupError> {
        Self::build(
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml)),
        )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, StartupError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StartupError> {
        if !(0.0..=1.0).contains(&self.model.threshold) {
            return Err(StartupError::Invalid(format!(
                "model.threshold must be within [0, 1], got {}",
                self.model.threshold
            )));
        }
        if !(0..=2).contains(&self.mqtt.qos) {
            return Err(StartupError::Invalid(format!(
                "mqtt.qos must be 0, 1 or 2, got {}",
                self.mqtt.qos
            )));
        }
        if self.mqtt.topic_results.is_empty() || self.mqtt.topic_image.is_empty() {
            return Err(StartupError::Invalid("mqtt topics must not be empty".to_string()));
        }
        if self.mqtt.topic_results == self.mqtt.topic_image {
            tracing::warn!(topic = %self.mqtt.topic_results, "results and image share one topic");
        }
        Ok(())
    }
}
