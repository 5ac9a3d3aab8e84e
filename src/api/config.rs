use axum::{extract::State, Json};
use tracing::info;

use crate::api::types::ClientConfig;
use crate::api::ApiState;

/// GET /api/config
///
/// Public values the tokenization SDK needs. The security key never leaves
/// the backend.
pub async fn get_config(State(state): State<ApiState>) -> Json<ClientConfig> {
    info!("GET /api/config");
    Json(state.client_config.clone())
}
