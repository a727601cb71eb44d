use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::detection::Detection;

/// Metadatos que acompañan a cada frame del visor en vivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMeta {
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub fps_est: f32,
    /// Número de pasadas de detección completadas desde el arranque.
    pub detect_pass: u64,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrameMetaMessage {
    pub r#type: String,
    pub meta: FrameMeta,
}

pub fn summarize_detections(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "sin vehículos".into();
    }
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0) += 1;
    }
    let mut parts: Vec<String> = counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect();
    parts.sort();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str) -> Detection {
        Detection {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            score: 0.5,
            class_id: 0,
            label: label.into(),
        }
    }

    #[test]
    fn test_summary_is_deterministic_and_grouped() {
        let dets = vec![det("car"), det("bus"), det("car")];
        assert_eq!(summarize_detections(&dets), "1 bus, 2 car");
    }

    #[test]
    fn test_summary_of_empty_pass() {
        assert_eq!(summarize_detections(&[]), "sin vehículos");
    }
}
