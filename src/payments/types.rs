use crate::payments::error::PaymentError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PagsmileEnvironment {
    Sandbox,
    Prod,
}

impl PagsmileEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagsmileEnvironment::Sandbox => "sandbox",
            PagsmileEnvironment::Prod => "prod",
        }
    }
}

impl std::fmt::Display for PagsmileEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PagsmileEnvironment {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sandbox" => Ok(PagsmileEnvironment::Sandbox),
            "prod" | "production" => Ok(PagsmileEnvironment::Prod),
            _ => Err(PaymentError::Validation {
                message: format!("unsupported pagsmile environment: {}", value),
                field: Some("env".to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PagsmileRegion {
    Bra,
    Eup,
    Usa,
}

impl PagsmileRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagsmileRegion::Bra => "BRA",
            PagsmileRegion::Eup => "EUP",
            PagsmileRegion::Usa => "USA",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    CreditCard,
    DiscoverCard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderCurrency {
    Brl,
    Hkd,
    Jpy,
    Usd,
    Eur,
    Gbp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentificationType {
    Cpf,
    Cnpj,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ThreeDsStatusCode {
    U,
    N,
    Y,
    A,
    C,
    D,
    R,
    I,
}

/// Trade state as reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Processing,
    Success,
    Cancel,
    Expired,
    Refused,
    Chargeback,
    Refunded,
}

impl TradeStatus {
    /// A terminal status never transitions again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Processing => "PROCESSING",
            TradeStatus::Success => "SUCCESS",
            TradeStatus::Cancel => "CANCEL",
            TradeStatus::Expired => "EXPIRED",
            TradeStatus::Refused => "REFUSED",
            TradeStatus::Chargeback => "CHARGEBACK",
            TradeStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decimal amount paired with its currency, e.g. `"100.00"` BRL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub currency: OrderCurrency,
}

impl Money {
    pub fn validate_positive(&self, field: &str) -> Result<(), PaymentError> {
        let parsed =
            BigDecimal::from_str(self.amount.trim()).map_err(|_| PaymentError::Validation {
                message: format!("invalid decimal amount: {}", self.amount),
                field: Some(field.to_string()),
            })?;
        if parsed <= BigDecimal::from(0) {
            return Err(PaymentError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some(field.to_string()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreeDsData {
    pub server_trans_id: String,
    pub version: String,
    pub cavv: String,
    pub status_code: ThreeDsStatusCode,
    pub eci: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason_code: Option<String>,
    pub liability_shift: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acs_trans_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ds_trans_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerIdentification {
    #[serde(rename = "type")]
    pub kind: IdentificationType,
    pub number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identify: Option<CustomerIdentification>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub ip_address: String,
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub out_trade_no: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub subject: String,
    pub content: String,
    pub buyer_id: String,
    pub customer: Customer,
    pub address: Option<Address>,
    pub device_info: Option<DeviceInfo>,
    pub return_url: Option<String>,
    pub timeout_express: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessPaymentRequest {
    pub out_trade_no: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub subject: String,
    pub content: String,
    pub buyer_id: String,
    pub token: String,
    pub user_ip: String,
    pub customer: Option<Customer>,
    pub address: Option<Address>,
    pub installments: Option<String>,
    pub threeds: Option<ThreeDsData>,
    pub device_user_agent: Option<String>,
    pub website_url: Option<String>,
    pub return_url: Option<String>,
    pub region: Option<PagsmileRegion>,
}

/// Either reference is enough for the gateway to find a trade.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub out_trade_no: Option<String>,
    pub trade_no: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub sub_msg: Option<String>,
    #[serde(default)]
    pub trade_no: String,
    #[serde(default)]
    pub out_trade_no: String,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub prepay_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub sub_msg: Option<String>,
    #[serde(default)]
    pub trade_no: String,
    #[serde(default)]
    pub out_trade_no: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub trade_status: Option<TradeStatus>,
    #[serde(default)]
    pub pay_url: Option<String>,
    #[serde(default)]
    pub check_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub sub_msg: Option<String>,
    #[serde(default)]
    pub trade_no: String,
    #[serde(default)]
    pub out_trade_no: String,
    #[serde(default)]
    pub trade_status: Option<TradeStatus>,
    #[serde(default)]
    pub order_currency: Option<OrderCurrency>,
    #[serde(default)]
    pub order_amount: Option<String>,
    #[serde(default)]
    pub refuse_detail: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

/// Asynchronous trade notification posted by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookNotification {
    #[serde(default)]
    pub trade_no: Option<String>,
    #[serde(default)]
    pub out_trade_no: Option<String>,
    #[serde(default)]
    pub trade_status: Option<String>,
    #[serde(default)]
    pub order_amount: Option<String>,
    #[serde(default)]
    pub order_currency: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}
