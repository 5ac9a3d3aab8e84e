use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::{error, info};

use crate::api::types::{PaymentStatusView, PaymentSubmitted, ProcessPaymentPayload};
use crate::api::{client_ip, parse_body, user_agent, with_request_id, ApiState};
use crate::error::AppError;
use crate::payments::constants::ensure_success;
use crate::payments::types::{Money, PagsmileRegion, ProcessPaymentRequest, QueryRequest};

/// POST /api/payments
pub async fn process_payment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<PaymentSubmitted>, AppError> {
    const FAILURE_MESSAGE: &str = "Failed to process payment";
    info!("POST /api/payments");

    let body: ProcessPaymentPayload = parse_body(&payload, &headers, "POST /api/payments")?;
    let user_ip = client_ip(&headers);
    let out_trade_no = body.out_trade_no.clone();

    info!(
        out_trade_no = %out_trade_no,
        method = ?body.method,
        order_amount = %body.order_amount,
        user_ip = %user_ip,
        "Processing payment"
    );

    let request = ProcessPaymentRequest {
        out_trade_no: body.out_trade_no,
        method: body.method,
        amount: Money {
            amount: body.order_amount,
            currency: body.order_currency,
        },
        subject: body.subject,
        content: body.content,
        buyer_id: body.buyer_id,
        token: body.token,
        user_ip,
        customer: body.customer,
        address: body.address,
        installments: body.installments,
        threeds: body.threeds,
        device_user_agent: user_agent(&headers),
        website_url: None,
        return_url: body.return_url,
        region: Some(PagsmileRegion::Bra),
    };

    let result = state
        .gateway
        .process_payment(request)
        .await
        .map_err(|e| with_request_id(AppError::from_payment(e, FAILURE_MESSAGE), &headers))?;

    if let Err(e) = ensure_success(&result.code, &result.msg, result.sub_msg.as_deref()) {
        error!(
            out_trade_no = %out_trade_no,
            code = %result.code,
            msg = %result.msg,
            "Pagsmile processPayment failed"
        );
        return Err(with_request_id(
            AppError::from_payment(e, FAILURE_MESSAGE),
            &headers,
        ));
    }

    info!(
        out_trade_no = %out_trade_no,
        trade_no = %result.trade_no,
        trade_status = ?result.trade_status,
        challenge = result.check_url.is_some(),
        "Payment processed"
    );

    Ok(Json(PaymentSubmitted {
        trade_no: result.trade_no,
        out_trade_no: result.out_trade_no,
        trade_status: result.trade_status,
        check_url: result.check_url,
        pay_url: result.pay_url,
    }))
}

/// GET /api/payments/{out_trade_no}
pub async fn get_payment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(out_trade_no): Path<String>,
) -> Result<Json<PaymentStatusView>, AppError> {
    const FAILURE_MESSAGE: &str = "Failed to query payment";
    info!(out_trade_no = %out_trade_no, "GET /api/payments/:outTradeNo");

    let result = state
        .gateway
        .query_payment(QueryRequest {
            out_trade_no: Some(out_trade_no.clone()),
            trade_no: None,
        })
        .await
        .map_err(|e| with_request_id(AppError::from_payment(e, FAILURE_MESSAGE), &headers))?;

    if let Err(e) = ensure_success(&result.code, &result.msg, result.sub_msg.as_deref()) {
        error!(
            out_trade_no = %out_trade_no,
            code = %result.code,
            msg = %result.msg,
            "Pagsmile queryPayment failed"
        );
        return Err(with_request_id(
            AppError::from_payment(e, FAILURE_MESSAGE),
            &headers,
        ));
    }

    let is_terminal = result
        .trade_status
        .map(|status| status.is_terminal())
        .unwrap_or(false);
    info!(
        out_trade_no = %out_trade_no,
        trade_status = ?result.trade_status,
        is_terminal,
        "Payment status retrieved"
    );

    Ok(Json(PaymentStatusView {
        trade_no: result.trade_no,
        out_trade_no: result.out_trade_no,
        trade_status: result.trade_status,
        order_amount: result.order_amount,
        order_currency: result.order_currency,
        refuse_detail: result.refuse_detail,
        is_terminal,
    }))
}
