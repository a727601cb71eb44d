use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::application::ports::LightBankPort;
use crate::domain::{
    errors::{DomainError, DomainResult},
    signal::{Cluster, LightColor},
};

/// Pines BCM de las tres luces de un cúmulo.
#[derive(Debug, Clone, Copy)]
pub struct LightPins {
    pub green: u8,
    pub yellow: u8,
    pub red: u8,
}

pub const CLUSTER_A_PINS: LightPins = LightPins {
    green: 23,
    yellow: 12,
    red: 16,
};

pub const CLUSTER_B_PINS: LightPins = LightPins {
    green: 26,
    yellow: 27,
    red: 22,
};

/// Banco de luces simulado: replica el mapa de pines del despliegue y
/// registra cada transición de nivel. El despliegue real sustituye este
/// adaptador por el driver GPIO de la placa sin tocar el núcleo.
pub struct SimulatedLightBank {
    pins_a: LightPins,
    pins_b: LightPins,
    levels: Mutex<HashMap<u8, bool>>,
}

impl SimulatedLightBank {
    pub fn new(pins_a: LightPins, pins_b: LightPins) -> Self {
        Self {
            pins_a,
            pins_b,
            levels: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_pins() -> Self {
        Self::new(CLUSTER_A_PINS, CLUSTER_B_PINS)
    }

    fn pin_for(&self, cluster: Cluster, color: LightColor) -> u8 {
        let pins = match cluster {
            Cluster::A => self.pins_a,
            Cluster::B => self.pins_b,
        };
        match color {
            LightColor::Green => pins.green,
            LightColor::Yellow => pins.yellow,
            LightColor::Red => pins.red,
        }
    }

    fn all_pins(&self) -> [u8; 6] {
        [
            self.pins_a.green,
            self.pins_a.yellow,
            self.pins_a.red,
            self.pins_b.green,
            self.pins_b.yellow,
            self.pins_b.red,
        ]
    }

    #[cfg(test)]
    pub fn is_on(&self, cluster: Cluster, color: LightColor) -> bool {
        let pin = self.pin_for(cluster, color);
        self.levels
            .lock()
            .map(|l| l.get(&pin).copied().unwrap_or(false))
            .unwrap_or(false)
    }
}

impl LightBankPort for SimulatedLightBank {
    fn set_light(&self, cluster: Cluster, color: LightColor, on: bool) -> DomainResult<()> {
        let pin = self.pin_for(cluster, color);
        let mut levels = self
            .levels
            .lock()
            .map_err(|_| DomainError::Hardware("registro de niveles envenenado".into()))?;
        levels.insert(pin, on);
        debug!("GPIO {} -> {}", pin, u8::from(on));
        Ok(())
    }

    fn clear_all(&self) -> DomainResult<()> {
        let mut levels = self
            .levels
            .lock()
            .map_err(|_| DomainError::Hardware("registro de niveles envenenado".into()))?;
        for pin in self.all_pins() {
            levels.insert(pin, false);
        }
        info!("Limpieza GPIO completada.");
        Ok(())
    }
}
