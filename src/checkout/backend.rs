//! Client side of the `/api/*` contract.
//!
//! `CheckoutBackend` is the seam the controller talks through. The reqwest
//! implementation targets a running instance of this service; tests swap in
//! an in-memory one.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::api::types::{
    ClientConfig, CreateOrderPayload, OrderCreated, PaymentStatusView, PaymentSubmitted,
    ProcessPaymentPayload,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-2xx reply. `message` is the `error` field of the JSON body, if any.
    #[error("backend returned HTTP {status}")]
    Api { status: u16, message: Option<String> },

    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn message(&self) -> Option<&str> {
        match self {
            BackendError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn fetch_config(&self) -> Result<ClientConfig, BackendError>;

    async fn create_order(&self, payload: &CreateOrderPayload) -> Result<OrderCreated, BackendError>;

    async fn process_payment(
        &self,
        payload: &ProcessPaymentPayload,
    ) -> Result<PaymentSubmitted, BackendError>;

    async fn fetch_status(&self, out_trade_no: &str) -> Result<PaymentStatusView, BackendError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpCheckoutBackend {
    base_url: String,
    client: Client,
}

impl HttpCheckoutBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    if !status.is_success() {
        debug!(status = status.as_u16(), body = %text, "backend request rejected");
        return Err(api_error(status, &text));
    }

    serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
}

fn api_error(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty());
    BackendError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl CheckoutBackend for HttpCheckoutBackend {
    async fn fetch_config(&self) -> Result<ClientConfig, BackendError> {
        self.get("/api/config").await
    }

    async fn create_order(&self, payload: &CreateOrderPayload) -> Result<OrderCreated, BackendError> {
        self.post("/api/orders", payload).await
    }

    async fn process_payment(
        &self,
        payload: &ProcessPaymentPayload,
    ) -> Result<PaymentSubmitted, BackendError> {
        self.post("/api/payments", payload).await
    }

    async fn fetch_status(&self, out_trade_no: &str) -> Result<PaymentStatusView, BackendError> {
        self.get(&format!("/api/payments/{}", out_trade_no)).await
    }
}
