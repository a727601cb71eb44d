use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::{DomainError, DomainResult},
    model::{DetectorParams, ModelId},
    signal::SignalPolicy,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8090,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device_path: String,
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_path: "/dev/video0".into(),
            fourcc: "MJPG".into(),
            width: 640,
            height: 640,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub model: ModelId,
    pub params: DetectorParams,
    /// Segundos entre pasadas de detección.
    pub interval_secs: u64,
    pub class_names: Vec<String>,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            model: ModelId {
                name: "vehiculos".into(),
                onnx_path: "models/best.onnx".into(),
            },
            params: DetectorParams::default(),
            interval_secs: 10,
            class_names: ["car", "bicycle", "bus", "truck", "motorbike"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub topic: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            topic: "smart_traffic/vehicles".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub detect: DetectConfig,
    pub signal: SignalPolicy,
    pub bus: BusConfig,
}

impl AppConfig {
    /// Carga el fichero JSON si existe; sin fichero se usan los valores por
    /// defecto documentados. Cualquier valor fuera de rango aborta el
    /// arranque, nunca se recorta en silencio.
    pub fn load(path: &str) -> Result<Self> {
        let cfg: AppConfig = if Path::new(path).exists() {
            let contents =
                fs::read_to_string(path).with_context(|| format!("no se pudo leer {path}"))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("configuración inválida en {path}"))?
        } else {
            tracing::info!("Sin fichero de configuración en {path}, usando valores por defecto");
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(DomainError::InvalidInput(
                "dimensiones de cámara a cero".into(),
            ));
        }
        if self.camera.fps == 0 {
            return Err(DomainError::InvalidInput("FPS de cámara a cero".into()));
        }
        if self.detect.interval_secs == 0 {
            return Err(DomainError::InvalidInput(
                "intervalo de detección a cero".into(),
            ));
        }

        let p = &self.detect.params;
        if p.input_size == 0 {
            return Err(DomainError::InvalidInput(
                "tamaño de entrada del modelo a cero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&p.conf_threshold) {
            return Err(DomainError::InvalidInput(format!(
                "umbral de confianza fuera de [0, 1]: {}",
                p.conf_threshold
            )));
        }
        if !(p.iou_threshold > 0.0 && p.iou_threshold <= 1.0) {
            return Err(DomainError::InvalidInput(format!(
                "umbral de IoU fuera de (0, 1]: {}",
                p.iou_threshold
            )));
        }
        if p.score_gain <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "ganancia de puntuación no positiva: {}",
                p.score_gain
            )));
        }
        if self.detect.class_names.is_empty() {
            return Err(DomainError::InvalidInput("lista de clases vacía".into()));
        }

        let s = &self.signal;
        if s.base_green_secs <= 0 || s.base_yellow_secs <= 0 || s.base_red_secs <= 0 {
            return Err(DomainError::InvalidInput(
                "las duraciones base deben ser positivas".into(),
            ));
        }
        if s.adjust_step_secs < 0 || s.min_phase_secs < 0 {
            return Err(DomainError::InvalidInput(
                "paso y suelo de la heurística no pueden ser negativos".into(),
            ));
        }

        if self.bus.topic.trim().is_empty() {
            return Err(DomainError::InvalidInput("topic del puente vacío".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_confidence_fails_fast() {
        let mut cfg = AppConfig::default();
        cfg.detect.params.conf_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_dimensions_fail_fast() {
        let mut cfg = AppConfig::default();
        cfg.camera.width = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_detect_interval_fails_fast() {
        let mut cfg = AppConfig::default();
        cfg.detect.interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_iou_threshold_fails_fast() {
        let mut cfg = AppConfig::default();
        cfg.detect.params.iou_threshold = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_non_positive_base_timing_fails_fast() {
        let mut cfg = AppConfig::default();
        cfg.signal.base_green_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_the_rest_with_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "detect": { "interval_secs": 5 } }"#).unwrap();
        assert_eq!(cfg.detect.interval_secs, 5);
        assert_eq!(cfg.detect.params.conf_threshold, 0.08);
        assert_eq!(cfg.signal.base_green_secs, 17);
        assert_eq!(cfg.server.port, 8090);
        assert!(cfg.validate().is_ok());
    }
}
