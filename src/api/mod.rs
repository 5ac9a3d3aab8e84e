pub mod config;
pub mod orders;
pub mod payments;
pub mod types;
pub mod webhooks;

use crate::api::types::ClientConfig;
use crate::error::AppError;
use crate::health;
use crate::middleware::error::get_request_id_from_headers;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::payments::PaymentGateway;
use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

const DEFAULT_CLIENT_IP: &str = "127.0.0.1";

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct ApiState {
    pub gateway: Arc<dyn PaymentGateway>,
    pub client_config: ClientConfig,
}

impl ApiState {
    pub fn new(gateway: Arc<dyn PaymentGateway>, client_config: ClientConfig) -> Self {
        Self {
            gateway,
            client_config,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .route("/api/orders", post(orders::create_order))
        .route("/api/payments", post(payments::process_payment))
        .route("/api/payments/{out_trade_no}", get(payments::get_payment))
        .route("/api/webhooks/pagsmile", post(webhooks::handle_pagsmile_webhook))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// First hop of `X-Forwarded-For`, or loopback when absent.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(DEFAULT_CLIENT_IP)
        .to_string()
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Parses a raw JSON body whatever its `Content-Type`; failures become the
/// generic "Invalid request body" error.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: &[u8],
    headers: &HeaderMap,
    route: &str,
) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(route, error = %e, "Failed to parse request body");
        with_request_id(
            AppError::invalid_body(e.to_string()).with_context(route.to_string()),
            headers,
        )
    })
}

pub(crate) fn with_request_id(err: AppError, headers: &HeaderMap) -> AppError {
    match get_request_id_from_headers(headers) {
        Some(id) => err.with_request_id(id),
        None => err,
    }
}
