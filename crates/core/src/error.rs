use thiserror::Error;

pub type AdPortalResult<T> = Result<T, AdPortalError>;

#[derive(Error, Debug)]
pub enum AdPortalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures converting between major-unit amounts and stored minor units.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoneyError {
    #[error("amount must be a finite number, got {0}")]
    NotFinite(f64),

    #[error("amount must be positive, got {0}")]
    NotPositive(f64),

    #[error("amount {amount} has more precision than {currency} allows")]
    TooPrecise { amount: f64, currency: String },

    #[error("amount {0} overflows minor units")]
    Overflow(f64),
}
