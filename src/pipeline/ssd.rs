use std::collections::HashMap;

use crate::pipeline::{BoundingBox, Detection, Detections};

type LabelMap = HashMap<i32, String>;

pub(crate) struct LabelParser {
    labels: LabelMap,
}

impl LabelParser {
    /// One `<index> <name>` pair per line; blank lines are skipped.
    pub(crate) fn parse(text: &str) -> Result<Self, String> {
        let mut labels = LabelMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let mut parts = line.split_whitespace();
            let (Some(num), Some(class)) = (parts.next(), parts.next()) else {
                continue;
            };
            let class_num = num
                .parse::<i32>()
                .map_err(|e| format!("line {}: bad class index {num:?}: {e}", lineno + 1))?;
            labels.insert(class_num, class.to_string());
        }
        Ok(Self { labels })
    }

    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn lookup(&self, class_num: i32) -> &str {
        self.labels.get(&class_num).map(String::as_str).unwrap_or("?")
    }
}

/// Output tensor shapes must be boxes `[.., N, 4]`, classes `[.., N]`,
/// scores `[.., N]`, count `[1]` in that order.
pub(crate) fn check_output_dims(dims: &[Vec<usize>]) -> Result<(), String> {
    let [boxes, classes, scores, count] = dims else {
        return Err(format!("expected 4 output tensors, found {}", dims.len()));
    };
    let n = match boxes.as_slice() {
        [.., n, 4] => *n,
        _ => return Err(format!("boxes output must end in [N, 4], got {boxes:?}")),
    };
    if classes.last() != Some(&n) || scores.last() != Some(&n) {
        return Err(format!(
            "classes {classes:?} and scores {scores:?} must end in {n} to match boxes {boxes:?}"
        ));
    }
    if count.iter().product::<usize>() != 1 {
        return Err(format!("count output must hold one value, got {count:?}"));
    }
    Ok(())
}

/// Raw postprocessed SSD outputs for one frame.
pub(crate) struct SsdOutputs<'a> {
    /// Normalised `[ymin, xmin, ymax, xmax]` per detection.
    pub locations: &'a [f32],
    pub classes: &'a [f32],
    pub scores: &'a [f32],
    pub count: &'a [f32],
}

impl SsdOutputs<'_> {
    /// The reported count is trusted only as far as every tensor has room.
    pub(crate) fn len(&self) -> usize {
        let reported = self.count.first().map_or(0, |c| c.max(0.0) as usize);
        reported
            .min(self.scores.len())
            .min(self.classes.len())
            .min(self.locations.len() / 4)
    }

    /// Boxes are scaled to a `width` x `height` image.
    pub(crate) fn decode(&self, labels: &LabelParser, width: f32, height: f32) -> Detections {
        (0..self.len())
            .map(|index| {
                let loc = &self.locations[4 * index..4 * index + 4];
                let bbox = BoundingBox {
                    x1: (width * loc[1]).clamp(0.0, width),
                    y1: (height * loc[0]).clamp(0.0, height),
                    x2: (width * loc[3]).clamp(0.0, width),
                    y2: (height * loc[2]).clamp(0.0, height),
                };
                let class_num = self.classes[index] as i32;
                let label = labels.lookup(class_num).to_string();
                let confidence = self.scores[index];
                tracing::trace!("det class {class_num} ({label}) score {confidence} at {bbox:?}");
                Detection {
                    label,
                    confidence,
                    bbox,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coco() -> LabelParser {
        LabelParser::parse("0  person\n1  bicycle\n\n17 dog\n").unwrap()
    }

    #[test]
    fn test_labels() {
        let labels = coco();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.lookup(0), "person");
        assert_eq!(labels.lookup(17), "dog");
        assert_eq!(labels.lookup(5), "?");
    }

    #[test]
    fn test_bad_label_index() {
        assert!(LabelParser::parse("zero person").is_err());
    }

    #[test]
    fn test_decode() {
        let outputs = SsdOutputs {
            locations: &[0.25, 0.5, 0.5, 0.75, 0.0, 0.0, 1.0, 1.0],
            classes: &[0.0, 17.0],
            scores: &[0.9, 0.4],
            count: &[2.0],
        };
        let dets = outputs.decode(&coco(), 100.0, 200.0);
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].label, "person");
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[0].bbox, BoundingBox { x1: 50.0, y1: 50.0, x2: 75.0, y2: 100.0 });
        assert_eq!(dets[1].label, "dog");
    }

    #[test]
    fn test_count_larger_than_tensors() {
        // count claims 10 but boxes only hold one full entry
        let outputs = SsdOutputs {
            locations: &[0.1, 0.2, 0.5, 0.6, 0.3, 0.3],
            classes: &[0.0, 0.0, 0.0],
            scores: &[0.9, 0.8, 0.7],
            count: &[10.0],
        };
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs.decode(&coco(), 10.0, 10.0).len(), 1);
    }

    #[test]
    fn test_missing_or_negative_count() {
        let mut outputs = SsdOutputs {
            locations: &[0.1, 0.2, 0.5, 0.6],
            classes: &[0.0],
            scores: &[0.9],
            count: &[],
        };
        assert!(outputs.decode(&coco(), 10.0, 10.0).is_empty());
        outputs.count = &[-3.0];
        assert_eq!(outputs.len(), 0);
    }

    #[test]
    fn test_output_dims() {
        let ssd = vec![vec![1, 10, 4], vec![1, 10], vec![1, 10], vec![1]];
        assert!(check_output_dims(&ssd).is_ok());

        // scores, boxes, count, classes ordering from newer exports
        let reordered = vec![vec![1, 10], vec![1, 10, 4], vec![1], vec![1, 10]];
        assert!(check_output_dims(&reordered).is_err());

        let mismatched = vec![vec![1, 10, 4], vec![1, 20], vec![1, 10], vec![1]];
        assert!(check_output_dims(&mismatched).is_err());

        assert!(check_output_dims(&ssd[..3]).is_err());
    }
}
