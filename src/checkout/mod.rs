//! Headless checkout flow: form rules, the state machine, status polling and
//! the seams to the backend and the card tokenization SDK.

pub mod backend;
pub mod controller;
pub mod form;
pub mod poller;
pub mod state;
pub mod tokenizer;

pub use backend::{BackendError, CheckoutBackend, HttpCheckoutBackend};
pub use controller::{
    CancelHandle, ChallengeHandle, ChallengeSignal, CheckoutController, CheckoutError,
    CheckoutOutcome,
};
pub use form::{CheckoutForm, FormErrors, FormField};
pub use poller::{PollOutcome, StatusPoller};
pub use state::{CheckoutEvent, CheckoutState, CheckoutStep};
pub use tokenizer::{CardTokenizer, SdkConfig, SdkOrderParams, SdkSubmission, TokenizerError};
