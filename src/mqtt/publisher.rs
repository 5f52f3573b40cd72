use std::sync::Arc;

use crate::app::config::MQTTConfig;
use crate::error::{PipelineError, Result};
use crate::mqtt::MessageBus;
use crate::pipeline::{DetectionSummary, RenderedImage};

/// Sends the two payloads of a request to their fixed topics.
#[derive(Clone)]
pub struct Publisher {
    bus: Arc<dyn MessageBus>,
    topic_results: String,
    topic_image: String,
}

impl Publisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic_results: &str, topic_image: &str) -> Self {
        Self {
            bus,
            topic_results: topic_results.to_string(),
            topic_image: topic_image.to_string(),
        }
    }

    pub fn from_config(bus: Arc<dyn MessageBus>, config: &MQTTConfig) -> Self {
        Self::new(bus, &config.topic_results, &config.topic_image)
    }

    pub async fn publish_result(&self, summary: &DetectionSummary) -> Result<()> {
        let json =
            serde_json::to_string(summary).map_err(|e| PipelineError::Encode(e.to_string()))?;
        self.bus.publish(&self.topic_results, json).await
    }

    pub async fn publish_image(&self, image: &RenderedImage) -> Result<()> {
        self.bus.publish(&self.topic_image, image.to_base64()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{summarize_detections, BoundingBox, Detection};
    use async_trait::async_trait;
    use base64::{prelude::BASE64_STANDARD, Engine};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBus {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageBus for RecordingBus {
        async fn publish(&self, topic: &str, payload: String) -> Result<()> {
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_topics_and_payloads() {
        let bus = Arc::new(RecordingBus::default());
        let publisher = Publisher::new(bus.clone(), "yolo/results", "yolo/image");
        let summary = summarize_detections(&[Detection {
            label: "person".to_string(),
            confidence: 0.75,
            bbox: BoundingBox { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 },
        }]);
        let image = RenderedImage { png: vec![0x89, b'P', b'N', b'G', 1, 2, 3] };

        publisher.publish_result(&summary).await.unwrap();
        publisher.publish_image(&image).await.unwrap();

        let sent = bus.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "yolo/results");
        assert_eq!(sent[0].1, r#"{"person":{"count":1,"confidence":[0.75]}}"#);
        assert_eq!(sent[1].0, "yolo/image");
        assert_eq!(BASE64_STANDARD.decode(&sent[1].1).unwrap(), image.png);
    }
}
