pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/manual_adjust/:cluster/:seconds", post(routes::manual_adjust))
        .route("/api/manual_reset", post(routes::manual_reset))
        .route("/api/enable_ai", post(routes::enable_ai))
        .route("/ws/stream", get(ws_handler))
        .with_state(state)
}
