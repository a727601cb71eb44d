use std::sync::Arc;

use crate::application::{controller::SignalController, services::MonitorService};

/// Estado compartido de los manejadores HTTP de Axum: el controlador de los
/// semáforos (estado y anulaciones) y el visor del nodo de detección.
#[derive(Clone)]
pub struct HttpState {
    pub signal: Arc<SignalController>,
    pub monitor: Arc<MonitorService>,
}
