//! Domain validation errors for core domain types.
//!
//! These errors are returned by `validate`/`try_new` constructors when a
//! value would violate a domain invariant.
//!
//! # Examples
//!
//! ```
//! use switchyard::domain::error::DomainError;
//! use switchyard::domain::transaction::SubmitParams;
//! use rust_decimal::Decimal;
//!
//! let params = SubmitParams::new("SOL", "USDC", Decimal::ZERO, "wallet");
//! assert!(matches!(params.validate(), Err(DomainError::NonPositiveAmount { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Transfer amount must be positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The invalid amount that was provided.
        amount: rust_decimal::Decimal,
    },

    /// Slippage is a fraction between 0 and 1.
    #[error("slippage must be between 0 and 1, got {slippage}")]
    SlippageOutOfRange {
        /// The invalid slippage that was provided.
        slippage: rust_decimal::Decimal,
    },

    /// A required text field was empty.
    #[error("{field} cannot be empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// Endpoint weight must be at least 1.
    #[error("endpoint weight must be positive")]
    ZeroWeight,

    /// A transaction ID was reused.
    #[error("transaction {id} was already submitted")]
    DuplicateTransaction {
        /// The reused ID.
        id: String,
    },
}
