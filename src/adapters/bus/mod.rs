use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::application::ports::VehicleBusPort;
use crate::domain::{
    counts::VehicleCount,
    errors::{DomainError, DomainResult},
};

/// Puente de conteos en proceso con la semántica del broker del despliegue:
/// publica-y-olvida, sin reintentos ni cola; el último mensaje pisa al
/// anterior en un buzón de un solo hueco.
pub struct LoopbackVehicleBus {
    topic: String,
    tx: watch::Sender<Option<VehicleCount>>,
}

impl LoopbackVehicleBus {
    pub fn new(topic: &str) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            topic: topic.to_string(),
            tx,
        }
    }
}

#[async_trait]
impl VehicleBusPort for LoopbackVehicleBus {
    async fn publish(&self, counts: VehicleCount) -> DomainResult<()> {
        // El payload JSON se conserva por paridad con el cable del broker.
        let payload = serde_json::to_string(&counts)
            .map_err(|e| DomainError::OperationFailed(format!("codificando conteo: {e}")))?;
        debug!("[{}] {}", self.topic, payload);
        self.tx.send_replace(Some(counts));
        Ok(())
    }

    async fn subscribe(&self) -> DomainResult<watch::Receiver<Option<VehicleCount>>> {
        Ok(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(approach_a: u32, approach_b: u32) -> VehicleCount {
        VehicleCount {
            approach_a,
            approach_b,
        }
    }

    #[tokio::test]
    async fn test_subscriber_sees_the_published_message() {
        let bus = LoopbackVehicleBus::new("smart_traffic/vehicles");
        let mut rx = bus.subscribe().await.unwrap();

        bus.publish(counts(3, 8)).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(counts(3, 8)));
    }

    #[tokio::test]
    async fn test_latest_message_overwrites_unread_ones() {
        let bus = LoopbackVehicleBus::new("smart_traffic/vehicles");
        let mut rx = bus.subscribe().await.unwrap();

        bus.publish(counts(1, 1)).await.unwrap();
        bus.publish(counts(2, 2)).await.unwrap();
        bus.publish(counts(9, 4)).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(counts(9, 4)));
    }

    #[tokio::test]
    async fn test_late_subscriber_starts_from_the_latest_value() {
        let bus = LoopbackVehicleBus::new("smart_traffic/vehicles");
        bus.publish(counts(5, 6)).await.unwrap();

        let rx = bus.subscribe().await.unwrap();
        assert_eq!(*rx.borrow(), Some(counts(5, 6)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_an_error() {
        let bus = LoopbackVehicleBus::new("smart_traffic/vehicles");
        assert!(bus.publish(counts(1, 0)).await.is_ok());
    }
}
