use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{AdjustResponse, ClusterStatus, MessageResponse, StatusResponse};
use crate::domain::signal::Cluster;

/// GET /api/status: temporización vigente de ambos cúmulos.
pub async fn get_status(State(st): State<HttpState>) -> impl IntoResponse {
    let (a, b) = st.signal.status();
    Json(StatusResponse {
        traffic_light_1: ClusterStatus::from(a),
        traffic_light_2: ClusterStatus::from(b),
    })
}

/// POST /api/manual_adjust/:cluster/:seconds: delta con signo sobre el
/// verde de un cúmulo; la fusión lo recoge en el siguiente arranque de ciclo.
pub async fn manual_adjust(
    State(st): State<HttpState>,
    Path((cluster, seconds)): Path<(u8, i64)>,
) -> impl IntoResponse {
    let Some(target) = Cluster::from_id(cluster) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("cúmulo desconocido: {cluster}") })),
        )
            .into_response();
    };

    st.signal.manual_adjust(target, seconds);
    Json(AdjustResponse {
        status: "OK".into(),
        cluster,
        green_delta_secs: seconds,
    })
    .into_response()
}

/// POST /api/manual_reset: ambos cúmulos a valores base y fusión suspendida.
pub async fn manual_reset(State(st): State<HttpState>) -> impl IntoResponse {
    st.signal.manual_reset();
    Json(MessageResponse {
        status: "OK".into(),
        message: "Ambos cúmulos en valores base; ajuste automático suspendido".into(),
    })
}

/// POST /api/enable_ai: reactiva el ajuste automático sin tocar los deltas.
pub async fn enable_ai(State(st): State<HttpState>) -> impl IntoResponse {
    st.signal.enable_auto();
    Json(MessageResponse {
        status: "OK".into(),
        message: "Ajuste automático de los semáforos activado".into(),
    })
}
