use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: String,
    },

    #[error("invalid plan: {plan}")]
    InvalidPlan {
        plan: String,
    },

    #[error("payment already recorded for reference {reference}")]
    DuplicateReference {
        reference: String,
    },

    #[error("guest already exists: {email}")]
    DuplicateGuest {
        email: String,
    },

    #[error("guest not found: {key}")]
    GuestNotFound {
        key: String,
    },

    #[error("invalid email: {email}")]
    InvalidEmail {
        email: String,
    },

    #[error("missing required field: {field}")]
    MissingField {
        field: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("verification failed: {reason}")]
    VerificationFailed {
        reason: String,
    },

    #[error("room not available or does not exist: {room_number}")]
    RoomUnavailable {
        room_number: String,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },

    #[error("notification error: {message}")]
    Notification {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn invalid_amount(amount: Money) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.minor().to_string(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        LedgerError::Store {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
