use std::collections::HashMap;

use serde::Serialize;

use crate::pipeline::Detection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSummary {
    #[serde(skip)]
    pub label: String,
    pub count: u32,
    /// In the order the detections were seen.
    pub confidence: Vec<f32>,
}

// Returns <label, summary>; key order means nothing
pub type DetectionSummary = HashMap<String, LabelSummary>;

pub fn summarize_detections(dets: &[Detection]) -> DetectionSummary {
    let mut dets_out = DetectionSummary::new();
    for det in dets {
        let entry = dets_out.entry(det.label.clone()).or_insert_with(|| LabelSummary {
            label: det.label.clone(),
            count: 0,
            confidence: Vec::new(),
        });
        entry.count += 1;
        entry.confidence.push(det.confidence);
    }
    dets_out
}

pub fn total_count(summary: &DetectionSummary) -> usize {
    summary.values().map(|s| s.count as usize).sum()
}
