use serde::{Deserialize, Serialize};

/// Mensaje de conteo por acceso, publicado una vez por pasada de detección.
/// En el cable se conserva el formato del despliegue: `{"c1": .., "c2": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleCount {
    #[serde(rename = "c1")]
    pub approach_a: u32,
    #[serde(rename = "c2")]
    pub approach_b: u32,
}

impl VehicleCount {
    pub fn total(&self) -> u32 {
        self.approach_a + self.approach_b
    }
}
