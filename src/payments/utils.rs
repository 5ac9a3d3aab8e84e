use crate::payments::constants::TIMESTAMP_FORMAT;
use crate::payments::error::{PaymentError, PaymentResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// JSON-over-HTTP client authenticated with a fixed Basic credential.
///
/// Requests are sent once; the gateway owns idempotency.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration, app_id: &str, security_key: &str) -> PaymentResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&basic_auth_header(app_id, security_key)).map_err(
            |e| PaymentError::Validation {
                message: format!("invalid gateway credentials: {}", e),
                field: Some("PAGSMILE_APP_ID".to_string()),
            },
        )?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> PaymentResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| PaymentError::Validation {
            message: format!("failed to encode gateway request: {}", e),
            field: None,
        })?;

        // `RequestBuilder::json` would pin the bare `application/json` type.
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(payload)
            .send()
            .await
            .map_err(|e| PaymentError::Network {
                message: format!("gateway request failed: {}", e),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| PaymentError::Network {
            message: format!("failed to read gateway response: {}", e),
        })?;

        // The gateway reports business failures in the body, sometimes with a
        // non-2xx status, so the body is parsed first.
        match serde_json::from_str::<T>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(status = %status, error = %e, "unparseable gateway response");
                let message = if status.is_success() {
                    format!("invalid gateway JSON response: {}", e)
                } else {
                    format!("HTTP {}: {}", status, text)
                };
                Err(PaymentError::InvalidResponse { message })
            }
        }
    }
}

pub fn basic_auth_header(app_id: &str, security_key: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", app_id, security_key));
    format!("Basic {}", encoded)
}

pub fn gateway_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Merchant trade number: epoch millis followed by 8 random alphanumerics.
pub fn generate_trade_no() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", millis, &random[..8])
}
