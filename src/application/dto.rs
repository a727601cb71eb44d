use serde::{Deserialize, Serialize};

use crate::domain::signal::ClusterTiming;

/// Estado de un cúmulo tal y como lo expone la API; las claves
/// (`green_time`, `yellow_time`, `red_time`, `vehicles`) son las que el
/// panel ya consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub green_time: i64,
    pub yellow_time: i64,
    pub red_time: i64,
    pub vehicles: Option<u32>,
}

impl From<ClusterTiming> for ClusterStatus {
    fn from(t: ClusterTiming) -> Self {
        Self {
            green_time: t.green_secs,
            yellow_time: t.yellow_secs,
            red_time: t.red_secs,
            vehicles: t.vehicles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub traffic_light_1: ClusterStatus,
    pub traffic_light_2: ClusterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustResponse {
    pub status: String,
    pub cluster: u8,
    pub green_delta_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}
