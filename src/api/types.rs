//! Browser-facing request and response bodies (camelCase on the wire).
//!
//! Shared by the axum handlers and by `HttpCheckoutBackend`, which speaks the
//! same contract from the other side.

use crate::payments::types::{
    Address, Customer, OrderCurrency, PagsmileEnvironment, PagsmileRegion, PaymentMethod,
    ThreeDsData, TradeStatus,
};
use crate::payments::PagsmileConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub app_id: String,
    pub public_key: String,
    pub env: PagsmileEnvironment,
    pub region_code: PagsmileRegion,
}

impl ClientConfig {
    pub fn from_pagsmile(config: &PagsmileConfig, region_code: PagsmileRegion) -> Self {
        Self {
            app_id: config.app_id.clone(),
            public_key: config.public_key.clone(),
            env: config.env,
            region_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub order_amount: String,
    pub order_currency: OrderCurrency,
    pub subject: String,
    pub content: String,
    pub buyer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_express: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub trade_no: String,
    pub out_trade_no: String,
    pub prepay_id: String,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentPayload {
    pub out_trade_no: String,
    pub method: PaymentMethod,
    pub order_amount: String,
    pub order_currency: OrderCurrency,
    pub subject: String,
    pub content: String,
    pub buyer_id: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threeds: Option<ThreeDsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmitted {
    pub trade_no: String,
    pub out_trade_no: String,
    pub trade_status: Option<TradeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub trade_no: String,
    pub out_trade_no: String,
    pub trade_status: Option<TradeStatus>,
    #[serde(default)]
    pub order_amount: Option<String>,
    #[serde(default)]
    pub order_currency: Option<OrderCurrency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuse_detail: Option<String>,
    pub is_terminal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub result: String,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            result: "success".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_payload_reads_camel_case() {
        let payload: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "orderAmount": "100.00",
            "orderCurrency": "BRL",
            "subject": "s",
            "content": "c",
            "buyerId": "buyer_1",
            "customer": {
                "name": "Maria",
                "identify": { "type": "CPF", "number": "52998224725" }
            }
        }))
        .unwrap();
        assert_eq!(payload.order_currency, OrderCurrency::Brl);
        assert_eq!(payload.buyer_id, "buyer_1");
        assert!(payload.return_url.is_none());
        let customer = payload.customer.unwrap();
        assert_eq!(customer.name.as_deref(), Some("Maria"));
        assert!(customer.email.is_none());
    }

    #[test]
    fn client_config_omits_security_key() {
        let pagsmile = PagsmileConfig {
            app_id: "app".to_string(),
            security_key: "secret".to_string(),
            public_key: "pk".to_string(),
            ..PagsmileConfig::default()
        };
        let value =
            serde_json::to_value(ClientConfig::from_pagsmile(&pagsmile, PagsmileRegion::Bra))
                .unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "appId": "app",
                "publicKey": "pk",
                "env": "sandbox",
                "regionCode": "BRA"
            })
        );
    }

    #[test]
    fn status_view_writes_is_terminal() {
        let view = PaymentStatusView {
            trade_no: "T1".to_string(),
            out_trade_no: "O1".to_string(),
            trade_status: Some(TradeStatus::Refused),
            order_amount: Some("10.00".to_string()),
            order_currency: Some(OrderCurrency::Brl),
            refuse_detail: Some("Insufficient funds".to_string()),
            is_terminal: true,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["isTerminal"], true);
        assert_eq!(value["tradeStatus"], "REFUSED");
        assert_eq!(value["refuseDetail"], "Insufficient funds");
    }
}
