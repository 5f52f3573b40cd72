use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::mqtt::Publisher;
use crate::pipeline::{
    decode_image, summarize_detections, total_count, DetectionSummary, Detector, ImageRenderer,
    ImageSource,
};

#[derive(Debug)]
pub enum Outcome {
    /// Nothing passed the filters; nothing was rendered or published.
    NoDetections,
    Published { summary: DetectionSummary },
}

/// fetch -> decode -> detect -> summarize -> render -> publish, for one URL.
///
/// All state is request-local apart from the shared, read-only detector.
pub struct Pipeline {
    source: Arc<dyn ImageSource>,
    detector: Detector,
    renderer: Arc<dyn ImageRenderer>,
    publisher: Publisher,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ImageSource>,
        detector: Detector,
        renderer: Arc<dyn ImageRenderer>,
        publisher: Publisher,
    ) -> Self {
        Self {
            source,
            detector,
            renderer,
            publisher,
        }
    }

    pub async fn run(&self, url: &str) -> Result<Outcome> {
        let bytes = self.source.fetch(url).await?;

        let detector = self.detector.clone();
        let (image, detections) = tokio::task::spawn_blocking(move || {
            let image = decode_image(&bytes)?;
            let detections = detector.detect(&image)?;
            Ok::<_, PipelineError>((image, detections))
        })
        .await??;
        tracing::debug!(?detections, "detections");

        if detections.is_empty() {
            return Ok(Outcome::NoDetections);
        }

        let summary = summarize_detections(&detections);
        tracing::info!(total = total_count(&summary), ?summary, "summary");

        let renderer = self.renderer.clone();
        let rendered =
            tokio::task::spawn_blocking(move || renderer.render(&image, &detections)).await??;

        // results first; a failed image publish does not undo it
        self.publisher.publish_result(&summary).await?;
        self.publisher.publish_image(&rendered).await?;
        Ok(Outcome::Published { summary })
    }
}
