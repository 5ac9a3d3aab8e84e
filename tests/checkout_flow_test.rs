//! End-to-end checkout flow: controller -> HTTP backend -> router -> scripted
//! gateway, with a fake tokenizer standing in for the browser SDK.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pagsmile_checkout::api::types::ClientConfig;
use pagsmile_checkout::api::{router, ApiState};
use pagsmile_checkout::checkout::state::{
    MSG_CHALLENGE_CANCELLED, MSG_PAYMENT_FAILED, MSG_POLL_TIMEOUT,
};
use pagsmile_checkout::checkout::{
    CardTokenizer, ChallengeHandle, CheckoutController, CheckoutError, CheckoutForm,
    CheckoutOutcome, CheckoutStep, FormField, HttpCheckoutBackend, SdkConfig, SdkOrderParams,
    SdkSubmission, TokenizerError,
};
use pagsmile_checkout::config::PollingConfig;
use pagsmile_checkout::payments::types::{
    CreateOrderRequest, CreateOrderResponse, PagsmileEnvironment, PagsmileRegion, PaymentResponse,
    ProcessPaymentRequest, QueryRequest, QueryResponse, TradeStatus,
};
use pagsmile_checkout::payments::{PaymentGateway, PaymentResult};

#[derive(Default)]
struct ScriptedGateway {
    reject_orders: bool,
    statuses: Mutex<VecDeque<(TradeStatus, Option<&'static str>)>>,
    orders: Mutex<Vec<CreateOrderRequest>>,
    payments: Mutex<Vec<ProcessPaymentRequest>>,
    queries: Mutex<u32>,
}

impl ScriptedGateway {
    fn with_statuses(statuses: Vec<(TradeStatus, Option<&'static str>)>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    fn query_count(&self) -> u32 {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<CreateOrderResponse> {
        let out_trade_no = request.out_trade_no.clone();
        self.orders.lock().unwrap().push(request);
        let (code, sub_msg) = if self.reject_orders {
            ("40004", Some("buyer_id is invalid".to_string()))
        } else {
            ("10000", None)
        };
        Ok(CreateOrderResponse {
            code: code.to_string(),
            msg: "msg".to_string(),
            sub_msg,
            trade_no: "T1".to_string(),
            out_trade_no,
            web_url: "https://checkout.example/T1".to_string(),
            prepay_id: "prepay_1".to_string(),
        })
    }

    async fn process_payment(&self, request: ProcessPaymentRequest) -> PaymentResult<PaymentResponse> {
        let out_trade_no = request.out_trade_no.clone();
        self.payments.lock().unwrap().push(request);
        Ok(PaymentResponse {
            code: "10000".to_string(),
            msg: "Success".to_string(),
            sub_msg: None,
            trade_no: "T1".to_string(),
            out_trade_no,
            web_url: None,
            trade_status: Some(TradeStatus::Processing),
            pay_url: None,
            check_url: None,
        })
    }

    async fn query_payment(&self, request: QueryRequest) -> PaymentResult<QueryResponse> {
        *self.queries.lock().unwrap() += 1;
        let (status, detail) = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((TradeStatus::Processing, None));
        Ok(QueryResponse {
            code: "10000".to_string(),
            msg: "Success".to_string(),
            sub_msg: None,
            trade_no: "T1".to_string(),
            out_trade_no: request.out_trade_no.unwrap_or_default(),
            trade_status: Some(status),
            order_currency: None,
            order_amount: Some("150.00".to_string()),
            refuse_detail: detail.map(str::to_string),
            create_time: None,
            update_time: None,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Stands in for the browser SDK. When a challenge is scripted, the frame's
/// reply is queued before `submit` returns.
struct FakeTokenizer {
    submission: SdkSubmission,
    challenge_reply: Option<serde_json::Value>,
    cancel_challenge: bool,
    challenge: Mutex<Option<ChallengeHandle>>,
    initialized_with: Mutex<Option<SdkConfig>>,
    submitted_with: Mutex<Option<SdkOrderParams>>,
}

impl FakeTokenizer {
    fn new(submission: SdkSubmission) -> Self {
        Self {
            submission,
            challenge_reply: None,
            cancel_challenge: false,
            challenge: Mutex::new(None),
            initialized_with: Mutex::new(None),
            submitted_with: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CardTokenizer for FakeTokenizer {
    async fn initialize(&self, config: &SdkConfig) -> Result<(), TokenizerError> {
        *self.initialized_with.lock().unwrap() = Some(config.clone());
        Ok(())
    }

    async fn submit(&self, params: &SdkOrderParams) -> Result<SdkSubmission, TokenizerError> {
        *self.submitted_with.lock().unwrap() = Some(params.clone());
        if let Some(handle) = self.challenge.lock().unwrap().as_ref() {
            if self.cancel_challenge {
                handle.cancel();
            } else if let Some(reply) = &self.challenge_reply {
                handle.forward_message(reply);
            }
        }
        Ok(self.submission.clone())
    }
}

fn client_config() -> ClientConfig {
    ClientConfig {
        app_id: "app_test".to_string(),
        public_key: "pk_test".to_string(),
        env: PagsmileEnvironment::Sandbox,
        region_code: PagsmileRegion::Bra,
    }
}

async fn start_backend(gateway: Arc<ScriptedGateway>) -> String {
    let app = router(ApiState::new(gateway, client_config()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fast_polling() -> PollingConfig {
    PollingConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_secs(5),
    }
}

async fn controller(
    gateway: Arc<ScriptedGateway>,
    tokenizer: Arc<FakeTokenizer>,
    polling: PollingConfig,
) -> CheckoutController {
    let base_url = start_backend(gateway).await;
    let backend = HttpCheckoutBackend::new(&base_url, Duration::from_secs(5)).unwrap();
    let mut controller = CheckoutController::new(Arc::new(backend), tokenizer.clone(), polling);
    *tokenizer.challenge.lock().unwrap() = Some(controller.challenge_handle());
    controller.init().await.unwrap();
    controller
}

fn valid_form() -> CheckoutForm {
    CheckoutForm {
        card_number: "4111 1111 1111 1111".to_string(),
        card_name: "Maria Silva".to_string(),
        exp_month: "12".to_string(),
        exp_year: "30".to_string(),
        cvv: "123".to_string(),
        cpf: "529.982.247-25".to_string(),
        email: "maria@example.com".to_string(),
        phone: "(11) 98765-4321".to_string(),
        amount: "150,00".to_string(),
        installments: "3".to_string(),
    }
}

#[tokio::test]
async fn test_sdk_payment_polls_until_success() {
    let gateway = Arc::new(ScriptedGateway::with_statuses(vec![
        (TradeStatus::Processing, None),
        (TradeStatus::Success, None),
    ]));
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let mut controller = controller(gateway.clone(), tokenizer.clone(), fast_polling()).await;

    assert_eq!(controller.client_config(), Some(&client_config()));

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Succeeded {
            trade_no: "T1".to_string()
        }
    );

    let state = controller.state();
    assert_eq!(state.step, CheckoutStep::Succeeded);
    assert_eq!(state.status, Some(TradeStatus::Success));
    assert_eq!(state.prepay_id.as_deref(), Some("prepay_1"));
    assert_eq!(gateway.query_count(), 2);

    let order = gateway.orders.lock().unwrap()[0].clone();
    assert_eq!(order.amount.amount, "150.00");
    assert!(order.buyer_id.starts_with("buyer_"));
    assert_eq!(state.out_trade_no.as_deref(), Some(order.out_trade_no.as_str()));

    let sdk = tokenizer.initialized_with.lock().unwrap().clone().unwrap();
    assert_eq!(sdk.prepay_id, "prepay_1");
    assert_eq!(sdk.app_id, "app_test");
    let params = tokenizer.submitted_with.lock().unwrap().clone().unwrap();
    assert_eq!(params.installments.stage, 3);
    assert_eq!(params.payer_id, "52998224725");
}

#[tokio::test]
async fn test_refused_payment_reports_refuse_detail() {
    let gateway = Arc::new(ScriptedGateway::with_statuses(vec![(
        TradeStatus::Refused,
        Some("Do not honor"),
    )]));
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let mut controller = controller(gateway, tokenizer, fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: "Do not honor".to_string()
        }
    );
    assert_eq!(controller.state().step, CheckoutStep::Failed);
    assert_eq!(controller.state().error_message.as_deref(), Some("Do not honor"));
}

#[tokio::test]
async fn test_polling_gives_up_after_timeout() {
    let gateway = Arc::new(ScriptedGateway::default());
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let polling = PollingConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_millis(200),
    };
    let mut controller = controller(gateway.clone(), tokenizer, polling).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: MSG_POLL_TIMEOUT.to_string()
        }
    );
    assert!(gateway.query_count() >= 2);
}

#[tokio::test]
async fn test_order_rejection_surfaces_backend_message() {
    let gateway = Arc::new(ScriptedGateway {
        reject_orders: true,
        ..ScriptedGateway::default()
    });
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let mut controller = controller(gateway, tokenizer.clone(), fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: "Invalid request parameters: buyer_id is invalid".to_string()
        }
    );
    assert!(tokenizer.initialized_with.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_sdk_rejection_without_message_uses_default() {
    let gateway = Arc::new(ScriptedGateway::default());
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Rejected { message: None }));
    let mut controller = controller(gateway.clone(), tokenizer, fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: MSG_PAYMENT_FAILED.to_string()
        }
    );
    assert_eq!(gateway.query_count(), 0);
}

#[tokio::test]
async fn test_tokenized_card_is_confirmed_by_backend() {
    let gateway = Arc::new(ScriptedGateway::with_statuses(vec![(
        TradeStatus::Success,
        None,
    )]));
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Tokenized {
        token: "tok_live".to_string(),
        threeds: None,
    }));
    let mut controller = controller(gateway.clone(), tokenizer, fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Succeeded { .. }));

    let payments = gateway.payments.lock().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].token, "tok_live");
    assert_eq!(payments[0].installments.as_deref(), Some("3"));
    assert_eq!(payments[0].region, Some(PagsmileRegion::Bra));
}

#[tokio::test]
async fn test_completed_challenge_resumes_polling() {
    let gateway = Arc::new(ScriptedGateway::with_statuses(vec![(
        TradeStatus::Success,
        None,
    )]));
    let mut tokenizer = FakeTokenizer::new(SdkSubmission::ChallengeRequired {
        check_url: "https://acs.example/3ds".to_string(),
    });
    tokenizer.challenge_reply = Some(json!({ "type": "3ds-complete" }));
    let mut controller = controller(gateway.clone(), Arc::new(tokenizer), fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Succeeded { .. }));
    assert!(controller.state().check_url.is_none());
    assert_eq!(gateway.query_count(), 1);
}

#[tokio::test]
async fn test_cancelled_challenge_fails_without_polling() {
    let gateway = Arc::new(ScriptedGateway::default());
    let mut tokenizer = FakeTokenizer::new(SdkSubmission::ChallengeRequired {
        check_url: "https://acs.example/3ds".to_string(),
    });
    tokenizer.cancel_challenge = true;
    let mut controller = controller(gateway.clone(), Arc::new(tokenizer), fast_polling()).await;

    let outcome = controller.submit(&valid_form()).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: MSG_CHALLENGE_CANCELLED.to_string()
        }
    );
    assert_eq!(gateway.query_count(), 0);
}

#[tokio::test]
async fn test_cancel_handle_stops_polling_and_resets() {
    let gateway = Arc::new(ScriptedGateway::default());
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let polling = PollingConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_secs(30),
    };
    let mut controller = controller(gateway.clone(), tokenizer, polling).await;
    let cancel = controller.cancel_handle();

    let task = tokio::spawn(async move {
        let outcome = controller.submit(&valid_form()).await.unwrap();
        (controller, outcome)
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    let (controller, outcome) = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("controller stopped")
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Cancelled);
    assert_eq!(controller.state().step, CheckoutStep::Idle);
    assert!(controller.state().out_trade_no.is_none());
    assert!(gateway.query_count() >= 1);
}

#[tokio::test]
async fn test_finished_attempt_must_be_reset_before_retrying() {
    let gateway = Arc::new(ScriptedGateway::with_statuses(vec![
        (TradeStatus::Expired, None),
        (TradeStatus::Success, None),
    ]));
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let mut controller = controller(gateway, tokenizer, fast_polling()).await;

    let first = controller.submit(&valid_form()).await.unwrap();
    assert!(matches!(first, CheckoutOutcome::Failed { .. }));

    let err = controller.submit(&valid_form()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidTransition(_)));

    controller.reset();
    assert_eq!(controller.state().step, CheckoutStep::Idle);
    let second = controller.submit(&valid_form()).await.unwrap();
    assert!(matches!(second, CheckoutOutcome::Succeeded { .. }));
}

#[tokio::test]
async fn test_invalid_form_never_reaches_backend() {
    let gateway = Arc::new(ScriptedGateway::default());
    let tokenizer = Arc::new(FakeTokenizer::new(SdkSubmission::Submitted));
    let mut controller = controller(gateway.clone(), tokenizer, fast_polling()).await;

    let mut form = valid_form();
    form.cpf = "111.111.111-11".to_string();
    form.amount = "0,50".to_string();

    match controller.submit(&form).await {
        Err(CheckoutError::InvalidForm(errors)) => {
            assert_eq!(errors.message_for(FormField::Cpf), Some("CPF inválido"));
            assert_eq!(errors.message_for(FormField::Amount), Some("Valor inválido"));
            assert_eq!(errors.errors.len(), 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(gateway.orders.lock().unwrap().is_empty());
    assert_eq!(controller.state().step, CheckoutStep::Idle);
}

#[tokio::test]
async fn test_submit_requires_loaded_configuration() {
    let base_url = start_backend(Arc::new(ScriptedGateway::default())).await;
    let backend = HttpCheckoutBackend::new(&base_url, Duration::from_secs(5)).unwrap();
    let mut controller = CheckoutController::new(
        Arc::new(backend),
        Arc::new(FakeTokenizer::new(SdkSubmission::Submitted)),
        fast_polling(),
    );

    let err = controller.submit(&valid_form()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotInitialized));
}
