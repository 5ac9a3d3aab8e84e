use crate::payments::constants::{
    endpoints, API_VERSION, CREATE_ORDER_PATH, DEFAULT_TIMEOUT_EXPRESS, PAY_PATH, QUERY_PATH,
    TRADE_TYPE_API,
};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::types::{
    Address, CreateOrderRequest, CreateOrderResponse, Customer, DeviceInfo, OrderCurrency,
    PagsmileEnvironment, PaymentMethod, PaymentResponse, ProcessPaymentRequest, QueryRequest,
    QueryResponse, ThreeDsData,
};
use crate::payments::utils::{gateway_timestamp, PaymentHttpClient};
use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PagsmileConfig {
    pub app_id: String,
    pub security_key: String,
    pub public_key: String,
    pub env: PagsmileEnvironment,
    /// Overrides the environment's gateway host.
    pub base_url: Option<String>,
    pub notify_url: String,
    pub return_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PagsmileConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            security_key: String::new(),
            public_key: String::new(),
            env: PagsmileEnvironment::Sandbox,
            base_url: None,
            notify_url: "http://localhost:3000/api/webhooks/pagsmile".to_string(),
            return_url: None,
            timeout_secs: 30,
        }
    }
}

impl PagsmileConfig {
    /// Reads `PAGSMILE_*` variables. `public_base_url` is where the gateway
    /// can reach this service for notifications.
    pub fn from_env(public_base_url: &str) -> PaymentResult<Self> {
        let env = PagsmileEnvironment::from_str(
            &std::env::var("PAGSMILE_ENV").unwrap_or_else(|_| "sandbox".to_string()),
        )?;

        Ok(Self {
            app_id: std::env::var("PAGSMILE_APP_ID").unwrap_or_default(),
            security_key: std::env::var("PAGSMILE_SECURITY_KEY").unwrap_or_default(),
            public_key: std::env::var("PAGSMILE_PUBLIC_KEY").unwrap_or_default(),
            env,
            base_url: std::env::var("PAGSMILE_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            notify_url: format!(
                "{}/api/webhooks/pagsmile",
                public_base_url.trim_end_matches('/')
            ),
            return_url: std::env::var("PAGSMILE_RETURN_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            timeout_secs: std::env::var("PAGSMILE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        })
    }

    pub fn gateway_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| endpoints(self.env).gateway.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

pub struct PagsmileGateway {
    config: PagsmileConfig,
    http: PaymentHttpClient,
}

impl PagsmileGateway {
    pub fn new(config: PagsmileConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(
            Duration::from_secs(config.timeout_secs),
            &config.app_id,
            &config.security_key,
        )?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.gateway_url(), path)
    }

    fn return_url<'a>(&'a self, requested: &'a Option<String>) -> Option<&'a str> {
        requested
            .as_deref()
            .or(self.config.return_url.as_deref())
    }
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    app_id: &'a str,
    out_trade_no: &'a str,
    method: PaymentMethod,
    order_amount: &'a str,
    order_currency: OrderCurrency,
    subject: &'a str,
    content: &'a str,
    trade_type: &'static str,
    timestamp: String,
    notify_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
    timeout_express: &'a str,
    version: &'static str,
    buyer_id: &'a str,
    customer: &'a Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_info: Option<&'a DeviceInfo>,
}

#[derive(Serialize)]
struct DeviceBody<'a> {
    user_agent: &'a str,
}

#[derive(Serialize)]
struct PayBody<'a> {
    app_id: &'a str,
    method: PaymentMethod,
    out_trade_no: &'a str,
    notify_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
    timestamp: String,
    subject: &'a str,
    content: &'a str,
    order_amount: &'a str,
    order_currency: OrderCurrency,
    buyer_id: &'a str,
    token: &'a str,
    user_ip: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<&'a Customer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threeds: Option<&'a ThreeDsData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<DeviceBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    website_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'static str>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    app_id: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_trade_no: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trade_no: Option<&'a str>,
}

#[async_trait]
impl PaymentGateway for PagsmileGateway {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> PaymentResult<CreateOrderResponse> {
        request.amount.validate_positive("orderAmount")?;

        let body = CreateOrderBody {
            app_id: &self.config.app_id,
            out_trade_no: &request.out_trade_no,
            method: request.method,
            order_amount: &request.amount.amount,
            order_currency: request.amount.currency,
            subject: &request.subject,
            content: &request.content,
            trade_type: TRADE_TYPE_API,
            timestamp: gateway_timestamp(),
            notify_url: &self.config.notify_url,
            return_url: self.return_url(&request.return_url),
            timeout_express: request
                .timeout_express
                .as_deref()
                .unwrap_or(DEFAULT_TIMEOUT_EXPRESS),
            version: API_VERSION,
            buyer_id: &request.buyer_id,
            customer: &request.customer,
            address: request.address.as_ref(),
            device_info: request.device_info.as_ref(),
        };

        debug!(out_trade_no = %request.out_trade_no, "sending pagsmile create order");
        let response: CreateOrderResponse = self
            .http
            .post_json(&self.endpoint(CREATE_ORDER_PATH), &body)
            .await?;
        info!(
            out_trade_no = %request.out_trade_no,
            code = %response.code,
            "pagsmile create order answered"
        );
        Ok(response)
    }

    async fn process_payment(
        &self,
        request: ProcessPaymentRequest,
    ) -> PaymentResult<PaymentResponse> {
        request.amount.validate_positive("orderAmount")?;
        if request.out_trade_no.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "out_trade_no is required".to_string(),
                field: Some("outTradeNo".to_string()),
            });
        }
        if request.token.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "card token is required".to_string(),
                field: Some("token".to_string()),
            });
        }

        let body = PayBody {
            app_id: &self.config.app_id,
            method: request.method,
            out_trade_no: &request.out_trade_no,
            notify_url: &self.config.notify_url,
            return_url: self.return_url(&request.return_url),
            timestamp: gateway_timestamp(),
            subject: &request.subject,
            content: &request.content,
            order_amount: &request.amount.amount,
            order_currency: request.amount.currency,
            buyer_id: &request.buyer_id,
            token: &request.token,
            user_ip: &request.user_ip,
            customer: request.customer.as_ref(),
            address: request.address.as_ref(),
            installments: request.installments.as_deref(),
            threeds: request.threeds.as_ref(),
            device: request
                .device_user_agent
                .as_deref()
                .map(|user_agent| DeviceBody { user_agent }),
            website_url: request.website_url.as_deref(),
            region: request.region.map(|r| r.as_str()),
        };

        debug!(out_trade_no = %request.out_trade_no, "sending pagsmile pay");
        let response: PaymentResponse = self.http.post_json(&self.endpoint(PAY_PATH), &body).await?;
        info!(
            out_trade_no = %request.out_trade_no,
            code = %response.code,
            trade_status = ?response.trade_status,
            "pagsmile pay answered"
        );
        Ok(response)
    }

    async fn query_payment(&self, request: QueryRequest) -> PaymentResult<QueryResponse> {
        let out_trade_no = request
            .out_trade_no
            .as_deref()
            .filter(|v| !v.trim().is_empty());
        let trade_no = request.trade_no.as_deref().filter(|v| !v.trim().is_empty());
        if out_trade_no.is_none() && trade_no.is_none() {
            return Err(PaymentError::Validation {
                message: "out_trade_no or trade_no is required".to_string(),
                field: Some("reference".to_string()),
            });
        }

        let body = QueryBody {
            app_id: &self.config.app_id,
            timestamp: gateway_timestamp(),
            out_trade_no,
            trade_no,
        };

        let response: QueryResponse = self
            .http
            .post_json(&self.endpoint(QUERY_PATH), &body)
            .await?;
        debug!(
            out_trade_no = ?out_trade_no,
            code = %response.code,
            trade_status = ?response.trade_status,
            "pagsmile query answered"
        );
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "pagsmile"
    }
}
