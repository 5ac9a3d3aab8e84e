//! Drives one checkout attempt from form submission to a terminal outcome.
//!
//! ```text
//! Idle -> OrderCreated -> SdkInitialized -> PaymentSubmitted
//!      -> [AwaitingChallenge] -> Polling -> Succeeded | Failed
//! ```
//!
//! Any failure along the way lands in `Failed` with a user-facing message.
//! A [`CancelHandle`] aborts the attempt from another task and returns the
//! controller to `Idle`.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::api::types::{ClientConfig, CreateOrderPayload, ProcessPaymentPayload};
use crate::checkout::backend::{BackendError, CheckoutBackend};
use crate::checkout::form::{CheckoutForm, FormErrors, OrderData};
use crate::checkout::poller::{PollOutcome, StatusPoller};
use crate::checkout::state::{
    CheckoutEvent, CheckoutState, CheckoutStep, InvalidTransition, MSG_CHALLENGE_CANCELLED,
    MSG_ORDER_FAILED, MSG_PAYMENT_FAILED, MSG_POLL_TIMEOUT, MSG_SDK_NOT_INITIALIZED,
};
use crate::checkout::tokenizer::{
    CardTokenizer, InstallmentStage, SdkConfig, SdkOrderParams, SdkSubmission,
};
use crate::config::PollingConfig;
use crate::payments::types::{OrderCurrency, PaymentMethod, ThreeDsData};

const CHALLENGE_COMPLETE_MESSAGE: &str = "3ds-complete";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("checkout form is invalid: {0}")]
    InvalidForm(FormErrors),

    #[error("checkout configuration not loaded")]
    NotInitialized,

    #[error("failed to load checkout configuration: {0}")]
    Config(#[source] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Succeeded { trade_no: String },
    Failed { message: String },
    /// Aborted through a [`CancelHandle`]; the controller is back in `Idle`.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeSignal {
    Completed,
    Cancelled,
}

impl ChallengeSignal {
    /// Maps a message posted by the 3DS frame; only `{"type": "3ds-complete"}`
    /// is recognised.
    pub fn from_message(message: &JsonValue) -> Option<Self> {
        match message.get("type").and_then(JsonValue::as_str) {
            Some(CHALLENGE_COMPLETE_MESSAGE) => Some(ChallengeSignal::Completed),
            _ => None,
        }
    }
}

/// Sends 3DS challenge results to a waiting controller.
#[derive(Debug, Clone)]
pub struct ChallengeHandle {
    tx: mpsc::UnboundedSender<ChallengeSignal>,
}

impl ChallengeHandle {
    pub fn complete(&self) {
        let _ = self.tx.send(ChallengeSignal::Completed);
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(ChallengeSignal::Cancelled);
    }

    /// Forwards a frame message; returns whether it was recognised.
    pub fn forward_message(&self, message: &JsonValue) -> bool {
        match ChallengeSignal::from_message(message) {
            Some(signal) => self.tx.send(signal).is_ok(),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

enum ChallengeResult {
    Completed,
    Cancelled,
    Aborted,
}

pub struct CheckoutController {
    backend: Arc<dyn CheckoutBackend>,
    tokenizer: Arc<dyn CardTokenizer>,
    poller: StatusPoller,
    client_config: Option<ClientConfig>,
    state: CheckoutState,
    cancel_tx: Arc<watch::Sender<bool>>,
    challenge_tx: mpsc::UnboundedSender<ChallengeSignal>,
    challenge_rx: mpsc::UnboundedReceiver<ChallengeSignal>,
}

impl CheckoutController {
    pub fn new(
        backend: Arc<dyn CheckoutBackend>,
        tokenizer: Arc<dyn CardTokenizer>,
        polling: PollingConfig,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let (challenge_tx, challenge_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            tokenizer,
            poller: StatusPoller::new(polling),
            client_config: None,
            state: CheckoutState::default(),
            cancel_tx: Arc::new(cancel_tx),
            challenge_tx,
            challenge_rx,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn client_config(&self) -> Option<&ClientConfig> {
        self.client_config.as_ref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    pub fn challenge_handle(&self) -> ChallengeHandle {
        ChallengeHandle {
            tx: self.challenge_tx.clone(),
        }
    }

    /// Loads the public SDK configuration from the backend.
    pub async fn init(&mut self) -> Result<&ClientConfig, CheckoutError> {
        let config = self
            .backend
            .fetch_config()
            .await
            .map_err(CheckoutError::Config)?;
        info!(env = %config.env, region = config.region_code.as_str(), "checkout configuration loaded");
        let config = self.client_config.insert(config);
        Ok(&*config)
    }

    pub fn reset(&mut self) {
        self.drain_challenges();
        self.cancel_tx.send_replace(false);
        self.state = CheckoutState::default();
    }

    /// Runs a full attempt. Form errors and out-of-order calls are returned as
    /// errors without touching the state; every other failure ends in
    /// [`CheckoutOutcome::Failed`].
    pub async fn submit(&mut self, form: &CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        form.validate().map_err(CheckoutError::InvalidForm)?;
        let client_config = self
            .client_config
            .clone()
            .ok_or(CheckoutError::NotInitialized)?;
        if self.state.step != CheckoutStep::Idle {
            return Err(InvalidTransition {
                from: self.state.step,
                event: "order_created",
            }
            .into());
        }

        self.drain_challenges();
        self.cancel_tx.send_replace(false);

        let order = form.order_data(chrono::Utc::now().timestamp_millis());
        let created = match self.backend.create_order(&order_payload(&order)).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, buyer_id = %order.buyer_id, "order creation failed");
                let message = e.message().unwrap_or(MSG_ORDER_FAILED).to_string();
                return self.fail(message);
            }
        };
        info!(out_trade_no = %created.out_trade_no, trade_no = %created.trade_no, "order created");
        self.state.apply(CheckoutEvent::OrderCreated {
            out_trade_no: created.out_trade_no.clone(),
            prepay_id: created.prepay_id.clone(),
        })?;
        if self.is_cancelled() {
            return self.cancelled();
        }

        let sdk_config = SdkConfig::for_order(&client_config, &created.prepay_id);
        if let Err(e) = self.tokenizer.initialize(&sdk_config).await {
            warn!(error = %e, out_trade_no = %created.out_trade_no, "tokenizer initialization failed");
            return self.fail(MSG_SDK_NOT_INITIALIZED);
        }
        self.state.apply(CheckoutEvent::SdkInitialized)?;

        let submission = match self.tokenizer.submit(&sdk_params(&order)).await {
            Ok(submission) => submission,
            Err(e) => {
                warn!(error = %e, out_trade_no = %created.out_trade_no, "tokenizer submit failed");
                return self.fail(MSG_PAYMENT_FAILED);
            }
        };
        self.state.apply(CheckoutEvent::PaymentSubmitted)?;

        let check_url = match submission {
            SdkSubmission::Submitted => None,
            SdkSubmission::ChallengeRequired { check_url } => Some(check_url),
            SdkSubmission::Rejected { message } => {
                let message = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| MSG_PAYMENT_FAILED.to_string());
                return self.fail(message);
            }
            SdkSubmission::Tokenized { token, threeds } => {
                let payload = payment_payload(&order, &created.out_trade_no, token, threeds);
                match self.backend.process_payment(&payload).await {
                    Ok(submitted) => submitted.check_url,
                    Err(e) => {
                        warn!(error = %e, out_trade_no = %created.out_trade_no, "payment confirmation failed");
                        let message = e.message().unwrap_or(MSG_PAYMENT_FAILED).to_string();
                        return self.fail(message);
                    }
                }
            }
        };

        if let Some(check_url) = check_url {
            info!(out_trade_no = %created.out_trade_no, "3DS challenge required");
            self.state
                .apply(CheckoutEvent::ChallengeRequired { check_url })?;
            match self.await_challenge().await {
                ChallengeResult::Completed => {
                    self.state.apply(CheckoutEvent::ChallengeCompleted)?;
                }
                ChallengeResult::Cancelled => {
                    info!(out_trade_no = %created.out_trade_no, "3DS challenge cancelled");
                    self.state.apply(CheckoutEvent::ChallengeCancelled)?;
                    return Ok(CheckoutOutcome::Failed {
                        message: MSG_CHALLENGE_CANCELLED.to_string(),
                    });
                }
                ChallengeResult::Aborted => return self.cancelled(),
            }
        }

        self.poll(&created.out_trade_no).await
    }

    async fn poll(&mut self, out_trade_no: &str) -> Result<CheckoutOutcome, CheckoutError> {
        self.state.apply(CheckoutEvent::PollingStarted)?;

        let cancel = self.cancel_tx.subscribe();
        let state = &mut self.state;
        let outcome = self
            .poller
            .run(self.backend.as_ref(), out_trade_no, cancel, |view| {
                let _ = state.apply(CheckoutEvent::StatusObserved {
                    trade_no: view.trade_no.clone(),
                    status: view.trade_status,
                });
            })
            .await;

        match outcome {
            PollOutcome::Succeeded { trade_no } => {
                info!(out_trade_no = %out_trade_no, trade_no = %trade_no, "payment succeeded");
                self.state.apply(CheckoutEvent::Succeeded {
                    trade_no: trade_no.clone(),
                })?;
                Ok(CheckoutOutcome::Succeeded { trade_no })
            }
            PollOutcome::Failed { message } => {
                info!(out_trade_no = %out_trade_no, reason = %message, "payment refused");
                self.fail(message)
            }
            PollOutcome::TimedOut => self.fail(MSG_POLL_TIMEOUT),
            PollOutcome::Cancelled => self.cancelled(),
        }
    }

    async fn await_challenge(&mut self) -> ChallengeResult {
        let mut cancel = self.cancel_tx.subscribe();
        if *cancel.borrow_and_update() {
            return ChallengeResult::Aborted;
        }

        loop {
            tokio::select! {
                signal = self.challenge_rx.recv() => {
                    return match signal {
                        Some(ChallengeSignal::Completed) => ChallengeResult::Completed,
                        Some(ChallengeSignal::Cancelled) | None => ChallengeResult::Cancelled,
                    };
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow_and_update() {
                        return ChallengeResult::Aborted;
                    }
                }
            }
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Result<CheckoutOutcome, CheckoutError> {
        let message = message.into();
        self.state.apply(CheckoutEvent::Failed {
            message: message.clone(),
        })?;
        Ok(CheckoutOutcome::Failed { message })
    }

    fn cancelled(&mut self) -> Result<CheckoutOutcome, CheckoutError> {
        info!(out_trade_no = ?self.state.out_trade_no, "checkout cancelled");
        self.state.apply(CheckoutEvent::Reset)?;
        Ok(CheckoutOutcome::Cancelled)
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    fn drain_challenges(&mut self) {
        while self.challenge_rx.try_recv().is_ok() {}
    }
}

fn order_payload(order: &OrderData) -> CreateOrderPayload {
    CreateOrderPayload {
        order_amount: order.order_amount.clone(),
        order_currency: OrderCurrency::Brl,
        subject: order.subject.clone(),
        content: order.content.clone(),
        buyer_id: order.buyer_id.clone(),
        customer: Some(order.customer.clone()),
        return_url: None,
        timeout_express: None,
    }
}

fn sdk_params(order: &OrderData) -> SdkOrderParams {
    let customer = &order.customer;
    SdkOrderParams {
        installments: InstallmentStage {
            stage: order.installments,
        },
        email: customer.email.clone().unwrap_or_default(),
        phone: customer.phone.clone().unwrap_or_default(),
        payer_id: customer
            .identify
            .as_ref()
            .map(|id| id.number.clone())
            .unwrap_or_default(),
    }
}

fn payment_payload(
    order: &OrderData,
    out_trade_no: &str,
    token: String,
    threeds: Option<ThreeDsData>,
) -> ProcessPaymentPayload {
    ProcessPaymentPayload {
        out_trade_no: out_trade_no.to_string(),
        method: PaymentMethod::CreditCard,
        order_amount: order.order_amount.clone(),
        order_currency: OrderCurrency::Brl,
        subject: order.subject.clone(),
        content: order.content.clone(),
        buyer_id: order.buyer_id.clone(),
        token,
        customer: Some(order.customer.clone()),
        address: None,
        installments: Some(order.installments.to_string()),
        return_url: None,
        threeds,
    }
}
