use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,      // nombre lógico, p.ej. "vehiculos"
    pub onnx_path: String, // ruta en disco
}

/// Parámetros de post-procesado del detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub input_size: u32,
    pub conf_threshold: f32, // 0..1
    pub iou_threshold: f32,  // 0..1
    /// Ganancia aplicada a las filas de puntuación antes de decodificar;
    /// la exportación float16 de referencia atenúa las salidas.
    pub score_gain: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.08,
            iou_threshold: 0.45,
            score_gain: 1.0,
        }
    }
}
