mod adapters;
mod application;
mod config;
mod domain;

use std::path::Path;
use std::sync::Arc;

use tower_http::services::ServeDir;
use tracing::info;

use crate::adapters::{
    bus::LoopbackVehicleBus,
    gpio::SimulatedLightBank,
    http::{router, state::HttpState},
    onnx::pipeline::DetectionPipeline,
};
use crate::application::{
    controller::SignalController,
    ports::{LightBankPort, VehicleBusPort},
    services::MonitorService,
};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // 2. Cargar y validar la configuración: cualquier valor fuera de rango
    // aborta aquí, antes de tocar la cámara o las salidas.
    let cfg_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".into());
    let cfg = AppConfig::load(&cfg_path)?;
    anyhow::ensure!(
        Path::new(&cfg.detect.model.onnx_path).exists(),
        "modelo ONNX no encontrado: {}",
        cfg.detect.model.onnx_path
    );

    info!("🚦 Controlador adaptativo de tráfico arrancando...");

    // 3. Adaptadores de infraestructura
    let lights: Arc<dyn LightBankPort> = Arc::new(SimulatedLightBank::with_default_pins());
    let bus: Arc<dyn VehicleBusPort> = Arc::new(LoopbackVehicleBus::new(&cfg.bus.topic));

    // 4. Nodo de detección (hilo propio: cámara + ONNX + publicación)
    let pipeline = Arc::new(DetectionPipeline::start(
        cfg.camera.clone(),
        cfg.detect.clone(),
        bus.clone(),
        tokio::runtime::Handle::current(),
    ));

    // 5. Controlador de ciclo y suscriptor de conteos
    let controller = SignalController::new(cfg.signal.clone(), lights.clone());
    controller.clone().spawn_count_listener(bus.subscribe().await?);
    let cycle = tokio::spawn(controller.clone().run());

    // 6. API de estado/anulación, visor y panel estático
    let state = HttpState {
        signal: controller,
        monitor: Arc::new(MonitorService::new(pipeline)),
    };
    let app = router(state).fallback_service(ServeDir::new("static"));

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    info!("🚀 Panel y API en http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // 7. Apagado: cancelar el ciclo (las guardas de fase apagan su pareja)
    // y dejar todas las salidas a nivel bajo.
    cycle.abort();
    let _ = cycle.await;
    lights.clear_all()?;
    info!("Limpieza GPIO hecha. Programa terminado.");

    Ok(())
}
