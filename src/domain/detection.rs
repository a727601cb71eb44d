use serde::{Deserialize, Serialize};

/// Caja detectada en coordenadas de píxel de la imagen original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersección sobre unión con otra caja alineada a los ejes.
    /// Unión nula => 0, nunca una división inválida.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;

        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }
}
