//! Card tokenization SDK seam.
//!
//! The SDK reads the card fields directly, binds them to the order's prepay
//! id and reports back one of the outcomes in [`SdkSubmission`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::ClientConfig;
use crate::payments::types::{PagsmileEnvironment, PagsmileRegion, ThreeDsData};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSelector {
    pub id_selector: String,
}

impl FieldSelector {
    fn id(id: &str) -> Self {
        Self {
            id_selector: id.to_string(),
        }
    }
}

/// Element ids the SDK mounts on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkFields {
    pub card_name: FieldSelector,
    pub card_number: FieldSelector,
    pub expiration_month: FieldSelector,
    pub expiration_year: FieldSelector,
    pub cvv: FieldSelector,
}

impl Default for SdkFields {
    fn default() -> Self {
        Self {
            card_name: FieldSelector::id("card-name"),
            card_number: FieldSelector::id("card-number"),
            expiration_month: FieldSelector::id("exp-month"),
            expiration_year: FieldSelector::id("exp-year"),
            cvv: FieldSelector::id("card-cvv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkConfig {
    pub app_id: String,
    pub public_key: String,
    pub env: PagsmileEnvironment,
    pub region_code: PagsmileRegion,
    pub prepay_id: String,
    pub fields: SdkFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_auth: Option<bool>,
}

impl SdkConfig {
    pub fn for_order(config: &ClientConfig, prepay_id: &str) -> Self {
        Self {
            app_id: config.app_id.clone(),
            public_key: config.public_key.clone(),
            env: config.env,
            region_code: config.region_code,
            prepay_id: prepay_id.to_string(),
            fields: SdkFields::default(),
            pre_auth: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallmentStage {
    pub stage: u32,
}

/// Payer details handed to the SDK alongside the card fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkOrderParams {
    pub installments: InstallmentStage,
    pub email: String,
    pub phone: String,
    /// CPF digits.
    pub payer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkSubmission {
    /// The SDK confirmed the payment itself; the trade should be polled.
    Submitted,
    /// The issuer wants a 3DS challenge at `check_url` first.
    ChallengeRequired { check_url: String },
    /// Card tokenized; the backend must confirm the payment.
    Tokenized {
        token: String,
        threeds: Option<ThreeDsData>,
    },
    Rejected { message: Option<String> },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    #[error("tokenizer not initialized")]
    NotInitialized,

    #[error("tokenizer initialization failed: {0}")]
    Initialization(String),

    #[error("tokenizer submit failed: {0}")]
    Submit(String),
}

#[async_trait]
pub trait CardTokenizer: Send + Sync {
    async fn initialize(&self, config: &SdkConfig) -> Result<(), TokenizerError>;

    async fn submit(&self, params: &SdkOrderParams) -> Result<SdkSubmission, TokenizerError>;
}
