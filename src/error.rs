use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that end or block a payment session.
///
/// Decode failures are deliberately absent: an unreadable frame is a
/// normal scanning event, not an error, and never leaves the reader.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid payment reference: {0}")]
    InvalidReference(String),
    #[error("camera device: {0}")]
    Device(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("payment was not settled for order {0}")]
    NotSettled(String),
    #[error("invalid session transition: {0}")]
    Transition(String),
}

/// Failures reported by the authorization gateway.
///
/// Business declines and transport failures are kept apart for
/// diagnostics; the session treats both as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway declined {operation}: {message}")]
    Declined {
        operation: &'static str,
        message: String,
    },
    #[error("gateway transport failure: {0}")]
    Transport(String),
}

/// Failures of the backend settlement verification call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("verification transport failure: {0}")]
    Transport(String),
    #[error("malformed verification response: {0}")]
    Malformed(String),
}
