use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use tracing::{error, info};

use crate::api::types::{CreateOrderPayload, OrderCreated};
use crate::api::{client_ip, parse_body, user_agent, with_request_id, ApiState};
use crate::error::AppError;
use crate::logging::{mask_document, mask_email};
use crate::payments::constants::ensure_success;
use crate::payments::types::{CreateOrderRequest, DeviceInfo, Money, PaymentMethod};
use crate::payments::utils::generate_trade_no;

const FAILURE_MESSAGE: &str = "Failed to create order";

/// POST /api/orders
pub async fn create_order(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<OrderCreated>, AppError> {
    let out_trade_no = generate_trade_no();
    info!(out_trade_no = %out_trade_no, "POST /api/orders");

    let body: CreateOrderPayload = parse_body(&payload, &headers, "POST /api/orders")?;

    let device_info = user_agent(&headers).map(|user_agent| DeviceInfo {
        user_agent,
        ip_address: client_ip(&headers),
    });
    let customer = body.customer.unwrap_or_default();
    info!(
        out_trade_no = %out_trade_no,
        order_amount = %body.order_amount,
        email = %customer.email.as_deref().map(mask_email).unwrap_or_default(),
        document = %customer
            .identify
            .as_ref()
            .map(|id| mask_document(&id.number))
            .unwrap_or_default(),
        "Creating order"
    );

    let request = CreateOrderRequest {
        out_trade_no: out_trade_no.clone(),
        method: PaymentMethod::CreditCard,
        amount: Money {
            amount: body.order_amount,
            currency: body.order_currency,
        },
        subject: body.subject,
        content: body.content,
        buyer_id: body.buyer_id,
        customer,
        address: None,
        device_info,
        return_url: body.return_url,
        timeout_express: body.timeout_express,
    };

    let result = state
        .gateway
        .create_order(request)
        .await
        .map_err(|e| with_request_id(AppError::from_payment(e, FAILURE_MESSAGE), &headers))?;

    if let Err(e) = ensure_success(&result.code, &result.msg, result.sub_msg.as_deref()) {
        error!(
            out_trade_no = %out_trade_no,
            code = %result.code,
            msg = %result.msg,
            "Pagsmile createOrder failed"
        );
        return Err(with_request_id(
            AppError::from_payment(e, FAILURE_MESSAGE),
            &headers,
        ));
    }

    info!(
        out_trade_no = %out_trade_no,
        trade_no = %result.trade_no,
        prepay_id = %result.prepay_id,
        "Order created successfully"
    );

    Ok(Json(OrderCreated {
        trade_no: result.trade_no,
        out_trade_no: result.out_trade_no,
        prepay_id: result.prepay_id,
        web_url: result.web_url,
    }))
}
