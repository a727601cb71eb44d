use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    application::ports::FrameFeedPort,
    domain::{errors::DomainResult, stream::FrameMeta},
};

/// Caso de uso del visor en vivo: expone el buzón del último frame del nodo
/// de detección a los manejadores del panel.
#[derive(Clone)]
pub struct MonitorService {
    feed: Arc<dyn FrameFeedPort>,
}

impl MonitorService {
    pub fn new(feed: Arc<dyn FrameFeedPort>) -> Self {
        Self { feed }
    }

    pub async fn subscribe(&self) -> DomainResult<watch::Receiver<Option<(FrameMeta, Vec<u8>)>>> {
        self.feed.subscribe().await
    }
}
