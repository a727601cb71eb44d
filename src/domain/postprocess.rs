use ndarray::{s, ArrayView2};

use super::counts::VehicleCount;
use super::detection::Detection;

/// Decodifica la salida cruda del modelo, ya transpuesta a filas de
/// predicción `[x, y, w, h, objetividad, clase0, clase1, ...]` con las
/// coordenadas normalizadas a `[0, 1]`. La confianza de cada fila es
/// `objetividad × max(clases)`; por debajo del umbral la fila se descarta.
/// Sin filas válidas el resultado es una secuencia vacía, nunca un error.
pub fn decode_predictions(
    preds: ArrayView2<'_, f32>,
    conf_threshold: f32,
    orig_w: f32,
    orig_h: f32,
    class_names: &[String],
) -> Vec<Detection> {
    let mut detections = Vec::new();

    for row in preds.rows() {
        if row.len() < 5 {
            continue;
        }
        let obj_conf = row[4];
        let scores = row.slice(s![5..]);

        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        else {
            continue;
        };

        let confidence = obj_conf * max_score;
        if confidence < conf_threshold {
            continue;
        }

        let (x, y, w, h) = (row[0], row[1], row[2], row[3]);
        detections.push(Detection {
            x1: (x - w / 2.0) * orig_w,
            y1: (y - h / 2.0) * orig_h,
            x2: (x + w / 2.0) * orig_w,
            y2: (y + h / 2.0) * orig_h,
            score: confidence,
            class_id,
            label: class_names
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| "objeto".into()),
        });
    }

    detections
}

/// Supresión de no-máximos: voraz, por puntuación descendente y agnóstica a
/// la clase (cajas de clases distintas también se suprimen entre sí). Un
/// candidato se elimina cuando su IoU con alguna caja conservada alcanza el
/// umbral. La ordenación estable fija los empates al orden de entrada.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) < iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Reparte las cajas supervivientes a ambos lados de la línea vertical de
/// referencia. El centro exactamente sobre la línea cuenta para el acceso B
/// (convención derecha-inclusiva).
pub fn count_by_midline(detections: &[Detection], mid_x: f32) -> VehicleCount {
    let mut counts = VehicleCount::default();
    for det in detections {
        if det.center_x() < mid_x {
            counts.approach_a += 1;
        } else {
            counts.approach_b += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn boxed(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            score,
            class_id,
            label: "car".into(),
        }
    }

    fn classes() -> Vec<String> {
        vec!["car".into(), "bus".into()]
    }

    #[test]
    fn test_decode_respects_confidence_threshold() {
        // fila 1: 0.9 × 0.8 = 0.72 pasa; fila 2: 0.2 × 0.3 = 0.06 no pasa
        let data = vec![
            0.5, 0.5, 0.2, 0.2, 0.9, 0.8, 0.1, //
            0.5, 0.5, 0.2, 0.2, 0.2, 0.3, 0.1,
        ];
        let preds = Array2::from_shape_vec((2, 7), data).unwrap();
        let dets = decode_predictions(preds.view(), 0.25, 640.0, 640.0, &classes());

        assert_eq!(dets.len(), 1);
        assert!(dets.iter().all(|d| d.score >= 0.25));
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].label, "car");
    }

    #[test]
    fn test_decode_converts_normalized_centers_to_pixel_corners() {
        let data = vec![0.5, 0.5, 0.2, 0.4, 1.0, 1.0];
        let preds = Array2::from_shape_vec((1, 6), data).unwrap();
        let dets = decode_predictions(preds.view(), 0.5, 100.0, 200.0, &classes());

        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x1 - 40.0).abs() < 1e-4);
        assert!((d.x2 - 60.0).abs() < 1e-4);
        assert!((d.y1 - 60.0).abs() < 1e-4);
        assert!((d.y2 - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_yields_empty_when_nothing_passes() {
        let data = vec![0.5, 0.5, 0.2, 0.2, 0.1, 0.1, 0.1];
        let preds = Array2::from_shape_vec((1, 7), data).unwrap();
        let dets = decode_predictions(preds.view(), 0.5, 640.0, 640.0, &classes());
        assert!(dets.is_empty());
    }

    #[test]
    fn test_nms_keeps_highest_score_of_an_overlap() {
        let candidates = vec![
            boxed(0.0, 0.0, 10.0, 10.0, 0.6, 0),
            boxed(1.0, 1.0, 11.0, 11.0, 0.9, 0),
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_is_class_agnostic() {
        // misma posición, clases distintas: una suprime a la otra
        let candidates = vec![
            boxed(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            boxed(0.0, 0.0, 10.0, 10.0, 0.8, 1),
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
    }

    #[test]
    fn test_nms_survivors_stay_below_threshold_pairwise() {
        let candidates = vec![
            boxed(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            boxed(2.0, 2.0, 12.0, 12.0, 0.8, 0),
            boxed(40.0, 40.0, 50.0, 50.0, 0.7, 1),
            boxed(41.0, 41.0, 51.0, 51.0, 0.95, 0),
        ];
        let kept = non_max_suppression(candidates, 0.45);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                assert!(kept[i].iou(&kept[j]) < 0.45);
            }
        }
    }

    #[test]
    fn test_nms_is_idempotent() {
        let candidates = vec![
            boxed(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            boxed(1.0, 1.0, 11.0, 11.0, 0.6, 0),
            boxed(40.0, 40.0, 50.0, 50.0, 0.7, 1),
        ];
        let once = non_max_suppression(candidates, 0.45);
        let twice = non_max_suppression(once.clone(), 0.45);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.x1, b.x1);
            assert_eq!(a.score, b.score);
            assert_eq!(a.class_id, b.class_id);
        }
    }

    #[test]
    fn test_nms_ties_break_by_input_order() {
        // empate exacto: sobrevive la primera caja de la entrada
        let candidates = vec![
            boxed(0.0, 0.0, 10.0, 10.0, 0.7, 0),
            boxed(0.0, 0.0, 10.0, 10.0, 0.7, 1),
        ];
        let kept = non_max_suppression(candidates, 0.45);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
    }

    #[test]
    fn test_midline_partition_is_total_and_disjoint() {
        let dets = vec![
            boxed(0.0, 0.0, 100.0, 50.0, 0.9, 0),    // centro 50, izquierda
            boxed(200.0, 0.0, 300.0, 50.0, 0.9, 0),  // centro 250, izquierda
            boxed(400.0, 0.0, 500.0, 50.0, 0.9, 0),  // centro 450, derecha
            boxed(500.0, 0.0, 600.0, 50.0, 0.9, 1),  // centro 550, derecha
            boxed(30.0, 60.0, 90.0, 100.0, 0.8, 1),  // centro 60, izquierda
        ];
        let counts = count_by_midline(&dets, 320.0);
        assert_eq!(counts.approach_a, 3);
        assert_eq!(counts.approach_b, 2);
        assert_eq!(counts.total() as usize, dets.len());
    }

    #[test]
    fn test_midline_boundary_counts_to_the_right() {
        let dets = vec![boxed(310.0, 0.0, 330.0, 50.0, 0.9, 0)]; // centro exacto 320
        let counts = count_by_midline(&dets, 320.0);
        assert_eq!(counts.approach_a, 0);
        assert_eq!(counts.approach_b, 1);
    }
}
