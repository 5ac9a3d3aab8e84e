use crate::payments::error::PaymentResult;
use crate::payments::types::{
    CreateOrderRequest, CreateOrderResponse, PaymentResponse, ProcessPaymentRequest, QueryRequest,
    QueryResponse,
};
use async_trait::async_trait;

/// Remote trade API. Implementations return the gateway envelope as-is;
/// callers decide how to treat non-success codes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: CreateOrderRequest)
        -> PaymentResult<CreateOrderResponse>;

    async fn process_payment(&self, request: ProcessPaymentRequest)
        -> PaymentResult<PaymentResponse>;

    async fn query_payment(&self, request: QueryRequest) -> PaymentResult<QueryResponse>;

    fn name(&self) -> &'static str;
}
