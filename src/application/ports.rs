use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{
    counts::VehicleCount,
    errors::DomainResult,
    signal::{Cluster, LightColor},
    stream::FrameMeta,
};

/// Puente de conteos entre el nodo de detección y el controlador.
/// Entrega como-mucho-una-vez y sin reconocimiento: el suscriptor conserva
/// únicamente el último mensaje llegado; un mensaje perdido significa
/// seguir con el conteo anterior.
#[async_trait]
pub trait VehicleBusPort: Send + Sync {
    async fn publish(&self, counts: VehicleCount) -> DomainResult<()>;
    async fn subscribe(&self) -> DomainResult<watch::Receiver<Option<VehicleCount>>>;
}

/// Buzón de un solo hueco con el último frame capturado, para el visor en
/// vivo. Un frame pisado antes de leerse es comportamiento esperado.
#[async_trait]
pub trait FrameFeedPort: Send + Sync {
    async fn subscribe(&self) -> DomainResult<watch::Receiver<Option<(FrameMeta, Vec<u8>)>>>;
}

/// Banco de salidas que gobierna las luces físicas. Las escrituras no
/// bloquean; un fallo se notifica pero nunca detiene el ciclo.
pub trait LightBankPort: Send + Sync {
    fn set_light(&self, cluster: Cluster, color: LightColor, on: bool) -> DomainResult<()>;
    /// Deja todas las salidas a nivel bajo (limpieza de apagado).
    fn clear_all(&self) -> DomainResult<()>;
}
