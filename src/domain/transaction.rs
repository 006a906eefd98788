//! Transaction submissions and their lifecycle records.
//!
//! Payload fields are opaque to the dispatch core: they are validated for
//! basic shape and passed through to whichever execution path is active.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::TransactionId;

/// Parameters of a transaction submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParams {
    /// Source asset.
    pub source: String,
    /// Destination asset.
    pub destination: String,
    /// Amount of the source asset.
    pub amount: Decimal,
    /// Maximum slippage as a fraction (0.005 = 0.5%).
    pub slippage: Decimal,
    /// Wallet that owns the transaction.
    pub wallet_address: String,
    /// Overrides the configured simulation flag when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_simulation: Option<bool>,
}

impl SubmitParams {
    /// Build params with a default slippage of 0.5%.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        amount: Decimal,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            amount,
            slippage: Decimal::new(5, 3),
            wallet_address: wallet_address.into(),
            is_simulation: None,
        }
    }

    #[must_use]
    pub fn with_slippage(mut self, slippage: Decimal) -> Self {
        self.slippage = slippage;
        self
    }

    #[must_use]
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.is_simulation = Some(simulation);
        self
    }

    /// Check the basic shape of the submission.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.source.is_empty() {
            return Err(DomainError::EmptyField { field: "source" });
        }
        if self.destination.is_empty() {
            return Err(DomainError::EmptyField {
                field: "destination",
            });
        }
        if self.wallet_address.is_empty() {
            return Err(DomainError::EmptyField {
                field: "wallet_address",
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount {
                amount: self.amount,
            });
        }
        if self.slippage < Decimal::ZERO || self.slippage > Decimal::ONE {
            return Err(DomainError::SlippageOutOfRange {
                slippage: self.slippage,
            });
        }
        Ok(())
    }

    /// Resolve the simulation flag against the configured default.
    #[must_use]
    pub fn simulation(&self, default: bool) -> bool {
        self.is_simulation.unwrap_or(default)
    }
}

/// Transaction signature as reported by the engine or the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(sig: impl Into<String>) -> Self {
        Self(sig.into())
    }

    /// Encode 64 raw signature bytes as base58.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a base58 string that decodes to exactly 64 bytes.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        bs58::decode(&self.0)
            .into_vec()
            .is_ok_and(|bytes| bytes.len() == 64)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a transaction.
///
/// `Submitted -> Pending -> {Confirmed | Finalized | Failed | TimedOut}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Submitted,
    Pending,
    Confirmed,
    Finalized,
    Failed,
    TimedOut,
}

impl TransactionStatus {
    /// Terminal states never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Finalized | Self::Failed | Self::TimedOut
        )
    }

    /// Terminal success states.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Confirmed | Self::Finalized)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which execution path carried a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionRoute {
    /// Out-of-process execution engine.
    Engine,
    /// In-process fallback through the admission queue and endpoint pool.
    Direct,
}

impl fmt::Display for ExecutionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => f.write_str("engine"),
            Self::Direct => f.write_str("direct"),
        }
    }
}

/// In-memory record of one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub signature: Option<Signature>,
    pub route: Option<ExecutionRoute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl TransactionRecord {
    /// A freshly submitted transaction.
    #[must_use]
    pub fn submitted(id: TransactionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TransactionStatus::Submitted,
            signature: None,
            route: None,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> SubmitParams {
        SubmitParams::new("SOL", "USDC", dec!(1.5), "wallet-1")
    }

    #[test]
    fn valid_params_pass() {
        assert_eq!(params().validate(), Ok(()));
    }

    #[test]
    fn slippage_above_one_is_rejected() {
        let p = params().with_slippage(dec!(1.2));
        assert!(matches!(
            p.validate(),
            Err(DomainError::SlippageOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_wallet_is_rejected() {
        let mut p = params();
        p.wallet_address.clear();
        assert_eq!(
            p.validate(),
            Err(DomainError::EmptyField {
                field: "wallet_address"
            })
        );
    }

    #[test]
    fn params_serialize_in_camel_case() {
        let json = serde_json::to_value(params().with_simulation(true)).unwrap();
        assert_eq!(json["walletAddress"], "wallet-1");
        assert_eq!(json["isSimulation"], true);
        assert_eq!(json["amount"], "1.5");
    }

    #[test]
    fn simulation_override_wins_over_default() {
        assert!(params().simulation(true));
        assert!(!params().with_simulation(false).simulation(true));
    }

    #[test]
    fn signature_shape() {
        assert!(Signature::from_bytes(&[7u8; 64]).is_well_formed());
        assert!(!Signature::new("SIG").is_well_formed());
        assert!(!Signature::new("0OIl").is_well_formed());
    }

    #[test]
    fn terminal_states() {
        assert!(!TransactionStatus::Submitted.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Confirmed.is_terminal());
        assert!(TransactionStatus::Finalized.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::TimedOut.is_terminal());
    }
}
