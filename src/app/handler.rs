use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::{total_count, Outcome, Pipeline};

pub const NO_DETECTIONS: &str = "No person in results";
pub const PUBLISHED: &str = "MQTT Message sent!";

#[derive(Clone)]
pub struct AppHandler {
    pipeline: Arc<Pipeline>,
}

impl AppHandler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[derive(Deserialize)]
struct WebhookRequest {
    url: Option<String>,
}

pub fn router(handler: AppHandler) -> Router {
    Router::new()
        .route("/yolo_webhook", post(webhook))
        .with_state(handler)
}

/// The body is taken raw so that any parse failure maps to the same 400.
fn parse_url(body: &[u8]) -> Result<String, PipelineError> {
    let request: WebhookRequest =
        serde_json::from_slice(body).map_err(|_| PipelineError::Validation)?;
    match request.url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(PipelineError::Validation),
    }
}

async fn webhook(State(handler): State<AppHandler>, body: Bytes) -> (StatusCode, String) {
    let url = match parse_url(&body) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!("rejected webhook body: {err}");
            return (err.status(), err.to_string());
        }
    };

    tracing::info!(%url, "webhook");
    match handler.pipeline.run(&url).await {
        Ok(Outcome::NoDetections) => {
            tracing::info!(%url, "no qualifying detections");
            (StatusCode::OK, NO_DETECTIONS.to_string())
        }
        Ok(Outcome::Published { summary }) => {
            let total = total_count(&summary);
            tracing::info!(%url, labels = summary.len(), total, "published");
            (StatusCode::OK, PUBLISHED.to_string())
        }
        Err(err) => {
            tracing::warn!(%url, "pipeline failed: {err}");
            (err.status(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let url = parse_url(br#"{"url": "http://cam/snap.jpg"}"#).unwrap();
        assert_eq!(url, "http://cam/snap.jpg");
        let url = parse_url(br#"{"url": "http://cam/a.jpg", "camera": 3}"#).unwrap();
        assert_eq!(url, "http://cam/a.jpg");
    }

    #[test]
    fn test_parse_url_rejects() {
        let bodies = [
            &b"{}"[..],
            b"",
            b"not json",
            br#"{"url": ""}"#,
            br#"{"url": null}"#,
            br#"{"url": 5}"#,
            b"[1,2]",
        ];
        for body in bodies {
            assert!(matches!(parse_url(body), Err(PipelineError::Validation)), "{:?}", body);
        }
    }
}
