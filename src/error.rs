//! Error handling for the checkout backend
//!
//! A single `AppError` crosses the HTTP boundary. It carries enough structure
//! to pick a status code, a machine-readable code and the message shown in
//! the checkout error banner.

use crate::payments::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "INVALID_REQUEST_BODY")]
    InvalidRequestBody,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "GATEWAY_REJECTED")]
    GatewayRejected,
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Body is not valid JSON or does not match the expected shape
    InvalidBody { reason: String },
    /// A field was present but unacceptable
    InvalidField { field: String, reason: String },
}

/// Payment gateway errors
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// The gateway answered with a non-success result code
    GatewayRejected { code: String, message: String },
    /// The gateway could not be reached or answered garbage.
    /// `operation` is the banner text for the failed call.
    GatewayUnavailable { operation: String, message: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Validation(ValidationError),
    External(ExternalError),
    Internal { message: String },
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidBody {
            reason: reason.into(),
        }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Internal {
            message: message.into(),
        })
    }

    /// Converts a gateway-layer error; `operation` is shown when the gateway
    /// itself is at fault, e.g. "Failed to create order".
    pub fn from_payment(err: PaymentError, operation: &str) -> Self {
        let kind = match err {
            PaymentError::Validation { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "request".to_string()),
                    reason: message,
                })
            }
            PaymentError::Gateway { code, message } => {
                AppErrorKind::External(ExternalError::GatewayRejected { code, message })
            }
            PaymentError::Network { message } | PaymentError::InvalidResponse { message } => {
                AppErrorKind::External(ExternalError::GatewayUnavailable {
                    operation: operation.to_string(),
                    message,
                })
            }
        };
        Self::new(kind)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::External(ExternalError::GatewayRejected { .. }) => 400,
            AppErrorKind::External(ExternalError::GatewayUnavailable { .. }) => 500,
            AppErrorKind::Internal { .. } => 500,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Validation(ValidationError::InvalidBody { .. }) => {
                ErrorCode::InvalidRequestBody
            }
            AppErrorKind::Validation(ValidationError::InvalidField { .. }) => {
                ErrorCode::ValidationError
            }
            AppErrorKind::External(ExternalError::GatewayRejected { .. }) => {
                ErrorCode::GatewayRejected
            }
            AppErrorKind::External(ExternalError::GatewayUnavailable { .. }) => {
                ErrorCode::GatewayUnavailable
            }
            AppErrorKind::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Message rendered in the checkout error banner
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Validation(ValidationError::InvalidBody { .. }) => {
                "Invalid request body".to_string()
            }
            AppErrorKind::Validation(ValidationError::InvalidField { reason, .. }) => {
                reason.clone()
            }
            AppErrorKind::External(ExternalError::GatewayRejected { message, .. }) => {
                message.clone()
            }
            AppErrorKind::External(ExternalError::GatewayUnavailable { operation, .. }) => {
                operation.clone()
            }
            AppErrorKind::Internal { message } => message.clone(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::GatewayUnavailable { .. })
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AppErrorKind::Validation(ValidationError::InvalidBody { reason }) => {
                write!(f, "invalid request body: {}", reason)?
            }
            AppErrorKind::Validation(ValidationError::InvalidField { field, reason }) => {
                write!(f, "invalid field {}: {}", field, reason)?
            }
            AppErrorKind::External(ExternalError::GatewayRejected { code, message }) => {
                write!(f, "gateway rejected request ({}): {}", code, message)?
            }
            AppErrorKind::External(ExternalError::GatewayUnavailable { operation, message }) => {
                write!(f, "{}: {}", operation, message)?
            }
            AppErrorKind::Internal { message } => write!(f, "internal error: {}", message)?,
        }
        if let Some(context) = &self.context {
            write!(f, " ({})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
