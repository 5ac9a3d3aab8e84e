use axum::{body::Bytes, http::HeaderMap, Json};
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::api::types::WebhookAck;
use crate::api::with_request_id;
use crate::error::AppError;
use crate::payments::constants::is_terminal_status;
use crate::payments::types::WebhookNotification;

/// POST /api/webhooks/pagsmile
///
/// Notifications are acknowledged once they parse as JSON. Trade state is
/// still read through the query endpoint, so nothing here mutates state.
pub async fn handle_pagsmile_webhook(
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    info!("POST /api/webhooks/pagsmile");

    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "Failed to process webhook");
            return Err(with_request_id(
                AppError::internal("Failed to process webhook").with_context(e.to_string()),
                &headers,
            ));
        }
    };

    match serde_json::from_value::<WebhookNotification>(payload.clone()) {
        Ok(notification) => {
            let is_terminal = notification
                .trade_status
                .as_deref()
                .map(is_terminal_status)
                .unwrap_or(false);
            info!(
                out_trade_no = ?notification.out_trade_no,
                trade_no = ?notification.trade_no,
                trade_status = ?notification.trade_status,
                is_terminal,
                "Webhook received"
            );
        }
        Err(e) => {
            // Field names only; the payload may carry buyer documents.
            let fields: Vec<&str> = payload
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            warn!(error = %e, ?fields, "Webhook received with unexpected shape");
        }
    }

    Ok(Json(WebhookAck::success()))
}
