use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid gateway response: {message}")]
    InvalidResponse { message: String },

    /// The gateway answered with a code other than `10000`.
    #[error("Gateway error: code={code}, message={message}")]
    Gateway { code: String, message: String },
}

impl PaymentError {
    pub fn gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Gateway {
            code: code.into(),
            message: message.into(),
        }
    }
}
