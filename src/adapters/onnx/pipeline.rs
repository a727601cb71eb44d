use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::adapters::onnx::yolo_engine::OnnxVehicleDetector;
use crate::adapters::v4l2::capture::VideoCapture;
use crate::application::ports::{FrameFeedPort, VehicleBusPort};
use crate::config::{CameraConfig, DetectConfig};
use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    postprocess::count_by_midline,
    stream::{summarize_detections, FrameMeta},
};

/// Nodo de detección: un hilo dedicado posee la cámara y la sesión ONNX,
/// alimenta el visor a ritmo de cámara y publica un conteo por intervalo en
/// el puente. Todos sus fallos son transitorios para el resto del sistema.
pub struct DetectionPipeline {
    frame_tx: watch::Sender<Option<(FrameMeta, Vec<u8>)>>,
}

impl DetectionPipeline {
    pub fn start(
        camera: CameraConfig,
        detect: DetectConfig,
        bus: Arc<dyn VehicleBusPort>,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        let (frame_tx, _rx) = watch::channel(None);
        let worker_tx = frame_tx.clone();

        std::thread::spawn(move || worker_loop(camera, detect, bus, tokio_handle, worker_tx));

        Self { frame_tx }
    }
}

#[async_trait]
impl FrameFeedPort for DetectionPipeline {
    async fn subscribe(&self) -> DomainResult<watch::Receiver<Option<(FrameMeta, Vec<u8>)>>> {
        Ok(self.frame_tx.subscribe())
    }
}

fn worker_loop(
    camera_cfg: CameraConfig,
    detect_cfg: DetectConfig,
    bus: Arc<dyn VehicleBusPort>,
    tokio_handle: tokio::runtime::Handle,
    frame_tx: watch::Sender<Option<(FrameMeta, Vec<u8>)>>,
) {
    let interval = Duration::from_secs(detect_cfg.interval_secs);

    let mut capture: Option<VideoCapture> = None;
    let mut detector: Option<OnnxVehicleDetector> = None;

    // La primera pasada llega un intervalo después del arranque.
    let mut last_detect = Instant::now();
    let mut detect_pass: u64 = 0;
    let mut last_detections: Vec<Detection> = Vec::new();
    let mut last_infer_ms: f32 = 0.0;

    let mut fps_est: f32 = 0.0;
    let mut last_t = Instant::now();

    info!(
        "Nodo de detección iniciado (intervalo = {}s)",
        detect_cfg.interval_secs
    );

    loop {
        // Recursos con reapertura: un fallo de cámara o de carga del modelo
        // se reintenta sin tumbar el proceso.
        if capture.is_none() {
            match VideoCapture::open(&camera_cfg) {
                Ok(c) => capture = Some(c),
                Err(e) => {
                    error!("Error abriendo cámara: {e:?}");
                    std::thread::sleep(Duration::from_secs(1));
                    continue;
                }
            }
        }
        if detector.is_none() {
            match OnnxVehicleDetector::load(&detect_cfg.model.onnx_path) {
                Ok(d) => {
                    info!("Modelo {} cargado", detect_cfg.model.name);
                    detector = Some(d);
                }
                Err(e) => {
                    error!("Error cargando modelo ONNX: {e:?}");
                    std::thread::sleep(Duration::from_secs(1));
                    continue;
                }
            }
        }

        let (Some(cap), Some(det)) = (capture.as_mut(), detector.as_mut()) else {
            continue;
        };

        match cap.grab() {
            Ok(frame) => {
                let dt = last_t.elapsed().as_secs_f32().max(0.001);
                last_t = Instant::now();
                fps_est = 0.9 * fps_est + 0.1 * (1.0 / dt);

                if last_detect.elapsed() >= interval {
                    last_detect = Instant::now();
                    detect_pass += 1;

                    let t_infer = Instant::now();
                    match det.detect(&frame.rgb, &detect_cfg.params, &detect_cfg.class_names) {
                        Ok(kept) => {
                            last_infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

                            let counts = count_by_midline(&kept, frame.width as f32 / 2.0);
                            info!(
                                "=== PASADA {} === IZQ = {} | DER = {} ({})",
                                detect_pass,
                                counts.approach_a,
                                counts.approach_b,
                                summarize_detections(&kept)
                            );

                            if let Err(e) = tokio_handle.block_on(bus.publish(counts)) {
                                warn!("No se pudo publicar el conteo: {e}");
                            }
                            last_detections = kept;
                        }
                        // Se conserva la última pasada buena.
                        Err(e) => warn!("Fallo de inferencia: {e:?}"),
                    }
                }

                let meta = FrameMeta {
                    width: frame.width,
                    height: frame.height,
                    infer_ms: last_infer_ms,
                    fps_est,
                    detect_pass,
                    detections: last_detections.clone(),
                };
                frame_tx.send_replace(Some((meta, frame.jpeg)));
            }
            Err(e) => {
                warn!("Error capturando frame: {e}");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}
