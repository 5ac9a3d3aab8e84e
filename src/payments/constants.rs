use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{PagsmileEnvironment, TradeStatus};

pub const SUCCESS_CODE: &str = "10000";
pub const API_VERSION: &str = "2.0";
pub const TRADE_TYPE_API: &str = "API";
pub const DEFAULT_TIMEOUT_EXPRESS: &str = "1d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CREATE_ORDER_PATH: &str = "/trade/create";
pub const PAY_PATH: &str = "/trade/pay";
pub const QUERY_PATH: &str = "/trade/query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub gateway: &'static str,
    pub security: &'static str,
}

pub fn endpoints(env: PagsmileEnvironment) -> Endpoints {
    match env {
        PagsmileEnvironment::Sandbox => Endpoints {
            gateway: "https://gateway-test.pagsmile.com",
            security: "https://security-test.pagsmile.com",
        },
        PagsmileEnvironment::Prod => Endpoints {
            gateway: "https://gateway.pagsmile.com",
            security: "https://security.pagsmile.com",
        },
    }
}

pub const TERMINAL_STATUSES: [TradeStatus; 6] = [
    TradeStatus::Success,
    TradeStatus::Cancel,
    TradeStatus::Expired,
    TradeStatus::Refused,
    TradeStatus::Chargeback,
    TradeStatus::Refunded,
];

/// Accepts the raw wire value so unknown statuses are simply non-terminal.
pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.iter().any(|s| s.as_str() == status)
}

fn base_message(code: &str) -> Option<Option<&'static str>> {
    match code {
        SUCCESS_CODE => Some(None),
        "40002" => Some(Some("Business operation failed")),
        "40004" => Some(Some("Invalid request parameters")),
        "40005" => Some(Some("Authentication failed")),
        "40006" => Some(Some("Duplicate transaction")),
        _ => None,
    }
}

/// Maps a gateway result code to the message shown to the buyer.
///
/// The success code maps to an empty string. Known codes keep their base
/// message and append the gateway detail after `": "`. Unknown codes fall
/// back to the detail itself.
pub fn error_message(code: &str, detail: Option<&str>) -> String {
    let detail = detail.map(str::trim).filter(|d| !d.is_empty());
    match base_message(code) {
        Some(None) => String::new(),
        Some(Some(base)) => match detail {
            Some(d) => format!("{}: {}", base, d),
            None => base.to_string(),
        },
        None => detail
            .map(str::to_string)
            .unwrap_or_else(|| "An unexpected error occurred".to_string()),
    }
}

/// Turns a gateway envelope into `Ok` or a `Gateway` error carrying the
/// buyer-facing message. `sub_msg` is preferred over `msg` as the detail.
pub fn ensure_success(code: &str, msg: &str, sub_msg: Option<&str>) -> PaymentResult<()> {
    if code == SUCCESS_CODE {
        return Ok(());
    }
    let detail = sub_msg
        .filter(|s| !s.trim().is_empty())
        .or(Some(msg));
    Err(PaymentError::gateway(code, error_message(code, detail)))
}
