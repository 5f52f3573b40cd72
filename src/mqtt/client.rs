use async_trait::async_trait;
use paho_mqtt as mqtt;

use crate::app::config::MQTTConfig;
use crate::error::{PipelineError, Result};

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
}

/// Connects, publishes one message and disconnects on every call. Nothing is
/// held open between requests.
pub struct MqttBus {
    server_uri: String,
    client_id: String,
    qos: i32,
}

impl MqttBus {
    pub fn new(config: &MQTTConfig) -> Self {
        Self {
            server_uri: format!("tcp://{}:{}", config.host, config.port),
            client_id: config.client_id.clone(),
            qos: config.qos,
        }
    }
}

fn transport_err(e: mqtt::Error) -> PipelineError {
    PipelineError::Transport(e.to_string())
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        let create_opts = mqtt::CreateOptionsBuilder::new()
            .server_uri(self.server_uri.as_str())
            .client_id(self.client_id.as_str())
            .finalize();
        let client = mqtt::AsyncClient::new(create_opts).map_err(transport_err)?;
        let conn_opts = mqtt::ConnectOptionsBuilder::new().clean_session(true).finalize();
        client
            .connect(conn_opts)
            .await
            .map_err(transport_err)?;

        let len = payload.len();
        let msg = mqtt::Message::new(topic, payload, self.qos);
        let published = client.publish(msg).await.map_err(transport_err);
        let _ = client.disconnect(None).await;
        published?;
        tracing::debug!(topic, len, uri = %self.server_uri, "published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: u16) -> MQTTConfig {
        MQTTConfig {
            host: "127.0.0.1".to_string(),
            port,
            topic_results: "yolo/results".to_string(),
            topic_image: "yolo/image".to_string(),
            client_id: String::new(),
            qos: 0,
        }
    }

    #[test]
    fn test_server_uri() {
        let bus = MqttBus::new(&config(1883));
        assert_eq!(bus.server_uri, "tcp://127.0.0.1:1883");
    }

    #[tokio::test]
    async fn test_unreachable_broker() {
        let bus = MqttBus::new(&config(1));
        let err = bus.publish("yolo/results", "{}".to_string()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
    }
}
