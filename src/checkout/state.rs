use crate::payments::types::TradeStatus;
use serde::Serialize;
use thiserror::Error;

pub const MSG_ORDER_FAILED: &str = "Erro ao criar pedido";
pub const MSG_SDK_NOT_INITIALIZED: &str = "SDK não inicializado";
pub const MSG_PAYMENT_FAILED: &str = "Erro ao processar pagamento";
pub const MSG_PAYMENT_REFUSED: &str = "Pagamento recusado";
pub const MSG_CHALLENGE_CANCELLED: &str = "Verificação 3DS cancelada";
pub const MSG_POLL_TIMEOUT: &str = "Tempo limite excedido. Verifique o status do pagamento.";

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Idle,
    OrderCreated,
    SdkInitialized,
    PaymentSubmitted,
    AwaitingChallenge,
    Polling,
    Succeeded,
    Failed,
}

impl CheckoutStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStep::Succeeded | CheckoutStep::Failed)
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckoutStep::Idle => "idle",
            CheckoutStep::OrderCreated => "order_created",
            CheckoutStep::SdkInitialized => "sdk_initialized",
            CheckoutStep::PaymentSubmitted => "payment_submitted",
            CheckoutStep::AwaitingChallenge => "awaiting_challenge",
            CheckoutStep::Polling => "polling",
            CheckoutStep::Succeeded => "succeeded",
            CheckoutStep::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    OrderCreated {
        out_trade_no: String,
        prepay_id: String,
    },
    SdkInitialized,
    PaymentSubmitted,
    ChallengeRequired {
        check_url: String,
    },
    ChallengeCompleted,
    ChallengeCancelled,
    PollingStarted,
    StatusObserved {
        trade_no: String,
        status: Option<TradeStatus>,
    },
    Succeeded {
        trade_no: String,
    },
    Failed {
        message: String,
    },
    Reset,
}

impl CheckoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::OrderCreated { .. } => "order_created",
            CheckoutEvent::SdkInitialized => "sdk_initialized",
            CheckoutEvent::PaymentSubmitted => "payment_submitted",
            CheckoutEvent::ChallengeRequired { .. } => "challenge_required",
            CheckoutEvent::ChallengeCompleted => "challenge_completed",
            CheckoutEvent::ChallengeCancelled => "challenge_cancelled",
            CheckoutEvent::PollingStarted => "polling_started",
            CheckoutEvent::StatusObserved { .. } => "status_observed",
            CheckoutEvent::Succeeded { .. } => "succeeded",
            CheckoutEvent::Failed { .. } => "failed",
            CheckoutEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("event {event} is not allowed in step {from}")]
pub struct InvalidTransition {
    pub from: CheckoutStep,
    pub event: &'static str,
}

/// Page-memory view of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutState {
    pub step: CheckoutStep,
    pub prepay_id: Option<String>,
    pub out_trade_no: Option<String>,
    pub trade_no: Option<String>,
    pub status: Option<TradeStatus>,
    pub error_message: Option<String>,
    pub check_url: Option<String>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self {
            step: CheckoutStep::Idle,
            prepay_id: None,
            out_trade_no: None,
            trade_no: None,
            status: None,
            error_message: None,
            check_url: None,
        }
    }
}

impl CheckoutState {
    /// Applies `event`, leaving the state untouched when it is not allowed.
    pub fn apply(&mut self, event: CheckoutEvent) -> Result<CheckoutStep, InvalidTransition> {
        use CheckoutEvent as E;
        use CheckoutStep as S;

        let from = self.step;
        let rejected = InvalidTransition {
            from,
            event: event.name(),
        };

        match (from, event) {
            (_, E::Reset) => {
                *self = CheckoutState::default();
            }
            (S::Idle, E::OrderCreated {
                out_trade_no,
                prepay_id,
            }) => {
                self.out_trade_no = Some(out_trade_no);
                self.prepay_id = Some(prepay_id);
                self.step = S::OrderCreated;
            }
            (S::OrderCreated, E::SdkInitialized) => self.step = S::SdkInitialized,
            (S::SdkInitialized, E::PaymentSubmitted) => self.step = S::PaymentSubmitted,
            (S::PaymentSubmitted, E::ChallengeRequired { check_url }) => {
                self.check_url = Some(check_url);
                self.step = S::AwaitingChallenge;
            }
            (S::AwaitingChallenge, E::ChallengeCompleted) => {
                self.check_url = None;
                self.step = S::Polling;
            }
            (S::AwaitingChallenge, E::ChallengeCancelled) => {
                self.check_url = None;
                self.error_message = Some(MSG_CHALLENGE_CANCELLED.to_string());
                self.step = S::Failed;
            }
            (S::PaymentSubmitted | S::Polling, E::PollingStarted) => self.step = S::Polling,
            (S::Polling, E::StatusObserved { trade_no, status }) => {
                if !trade_no.is_empty() {
                    self.trade_no = Some(trade_no);
                }
                self.status = status;
            }
            (S::PaymentSubmitted | S::Polling, E::Succeeded { trade_no }) => {
                if !trade_no.is_empty() {
                    self.trade_no = Some(trade_no);
                }
                self.status = Some(TradeStatus::Success);
                self.step = S::Succeeded;
            }
            (step, E::Failed { message }) if !step.is_terminal() => {
                self.check_url = None;
                self.error_message = Some(message);
                self.step = S::Failed;
            }
            _ => return Err(rejected),
        }

        Ok(self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> CheckoutState {
        let mut state = CheckoutState::default();
        state
            .apply(CheckoutEvent::OrderCreated {
                out_trade_no: "ord_1".to_string(),
                prepay_id: "prepay_1".to_string(),
            })
            .unwrap();
        state.apply(CheckoutEvent::SdkInitialized).unwrap();
        state.apply(CheckoutEvent::PaymentSubmitted).unwrap();
        state
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let mut state = submitted();
        assert_eq!(state.out_trade_no.as_deref(), Some("ord_1"));
        assert_eq!(state.prepay_id.as_deref(), Some("prepay_1"));

        state.apply(CheckoutEvent::PollingStarted).unwrap();
        state
            .apply(CheckoutEvent::StatusObserved {
                trade_no: "T1".to_string(),
                status: Some(TradeStatus::Processing),
            })
            .unwrap();
        assert_eq!(state.status, Some(TradeStatus::Processing));

        let step = state
            .apply(CheckoutEvent::Succeeded {
                trade_no: "T1".to_string(),
            })
            .unwrap();
        assert_eq!(step, CheckoutStep::Succeeded);
        assert_eq!(state.trade_no.as_deref(), Some("T1"));
    }

    #[test]
    fn challenge_round_trip_clears_check_url() {
        let mut state = submitted();
        state
            .apply(CheckoutEvent::ChallengeRequired {
                check_url: "https://acs.example/3ds".to_string(),
            })
            .unwrap();
        assert_eq!(state.step, CheckoutStep::AwaitingChallenge);
        assert!(state.check_url.is_some());

        state.apply(CheckoutEvent::ChallengeCompleted).unwrap();
        assert_eq!(state.step, CheckoutStep::Polling);
        assert!(state.check_url.is_none());
    }

    #[test]
    fn cancelled_challenge_fails_with_message() {
        let mut state = submitted();
        state
            .apply(CheckoutEvent::ChallengeRequired {
                check_url: "https://acs.example/3ds".to_string(),
            })
            .unwrap();
        state.apply(CheckoutEvent::ChallengeCancelled).unwrap();
        assert_eq!(state.step, CheckoutStep::Failed);
        assert_eq!(state.error_message.as_deref(), Some(MSG_CHALLENGE_CANCELLED));
    }

    #[test]
    fn out_of_order_events_are_rejected_without_side_effects() {
        let mut state = CheckoutState::default();
        let before = state.clone();
        let err = state.apply(CheckoutEvent::PaymentSubmitted).unwrap_err();
        assert_eq!(err.from, CheckoutStep::Idle);
        assert_eq!(err.event, "payment_submitted");
        assert_eq!(state, before);

        let mut state = submitted();
        assert!(state.apply(CheckoutEvent::ChallengeCompleted).is_err());
        assert_eq!(state.step, CheckoutStep::PaymentSubmitted);
    }

    #[test]
    fn terminal_states_only_accept_reset() {
        let mut state = CheckoutState::default();
        state
            .apply(CheckoutEvent::Failed {
                message: MSG_ORDER_FAILED.to_string(),
            })
            .unwrap();
        assert!(state
            .apply(CheckoutEvent::Failed {
                message: "again".to_string()
            })
            .is_err());
        assert_eq!(state.error_message.as_deref(), Some(MSG_ORDER_FAILED));

        state.apply(CheckoutEvent::Reset).unwrap();
        assert_eq!(state, CheckoutState::default());
    }
}
