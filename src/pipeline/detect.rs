use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;

use crate::app::config::ModelConfig;
use crate::error::Result;

/// Pixel coordinates in the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub type Detections = Vec<Detection>;

/// A loaded detection network. Implementations return everything the network
/// produced; filtering happens in [`Detector`].
pub trait ObjectModel: Send + Sync {
    fn infer(&self, image: &RgbImage) -> Result<Detections>;
}

/// Applies the startup threshold and class allow-list to a shared model.
#[derive(Clone)]
pub struct Detector {
    model: Arc<dyn ObjectModel>,
    threshold: f32,
    classes: Vec<String>,
}

impl Detector {
    pub fn new(model: Arc<dyn ObjectModel>, threshold: f32, classes: Vec<String>) -> Self {
        Self {
            model,
            threshold,
            classes,
        }
    }

    pub fn from_config(model: Arc<dyn ObjectModel>, config: &ModelConfig) -> Self {
        Self::new(model, config.threshold, config.classes.clone())
    }

    /// Kept detections have `confidence > threshold`. An empty allow-list
    /// admits every label.
    pub fn detect(&self, image: &RgbImage) -> Result<Detections> {
        let raw = self.model.infer(image)?;
        let total = raw.len();
        let kept: Detections = raw
            .into_iter()
            .filter(|det| det.confidence > self.threshold)
            .filter(|det| self.classes.is_empty() || self.classes.iter().any(|c| *c == det.label))
            .collect();
        tracing::trace!(total, kept = kept.len(), "filtered detections");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(Detections);

    impl ObjectModel for FixedModel {
        fn infer(&self, _image: &RgbImage) -> Result<Detections> {
            Ok(self.0.clone())
        }
    }

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: BoundingBox { x1: 1.0, y1: 2.0, x2: 10.0, y2: 20.0 },
        }
    }

    fn detector(dets: Detections, threshold: f32, classes: &[&str]) -> Detector {
        Detector::new(
            Arc::new(FixedModel(dets)),
            threshold,
            classes.iter().map(|c| c.to_string()).collect(),
        )
    }

    #[test]
    fn test_threshold_boundary() {
        let image = RgbImage::new(32, 32);
        let dets = vec![det("person", 0.5), det("person", 0.5001), det("person", 0.4999)];
        let d = detector(dets, 0.5, &["person"]);
        let kept = d.detect(&image).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.5001);
    }

    #[test]
    fn test_class_allow_list() {
        let image = RgbImage::new(32, 32);
        let dets = vec![det("dog", 0.9), det("person", 0.8), det("car", 0.95)];
        let d = detector(dets, 0.25, &["person"]);
        let kept = d.detect(&image).unwrap();
        assert_eq!(kept, vec![det("person", 0.8)]);
    }

    #[test]
    fn test_empty_allow_list_admits_all() {
        let image = RgbImage::new(32, 32);
        let d = detector(vec![det("dog", 0.9), det("person", 0.8)], 0.25, &[]);
        assert_eq!(d.detect(&image).unwrap().len(), 2);
    }

    #[test]
    fn test_nothing_qualifies_is_not_an_error() {
        let image = RgbImage::new(32, 32);
        let d = detector(vec![det("dog", 0.9)], 0.25, &["person"]);
        assert!(d.detect(&image).unwrap().is_empty());
    }
}
