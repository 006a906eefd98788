//! Engine line protocol.
//!
//! One JSON object per line in each direction. Outbound:
//!
//! ```text
//! {"type":"submit_transaction","id":"<id>","params":{...}}
//! ```
//!
//! Inbound messages are `transaction_update`, `status` and `error`. Unknown
//! fields are ignored; lines that do not parse are the caller's to log.

use serde::{Deserialize, Serialize};

use crate::domain::{Signature, SubmitParams, TransactionId};
use crate::port::{TransactionUpdate, UpdateOutcome};

/// Message written to the engine's stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand<'a> {
    SubmitTransaction {
        id: &'a TransactionId,
        params: &'a SubmitParams,
    },
}

impl EngineCommand<'_> {
    /// Serialize as one newline-terminated line.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Pending,
    Confirmed,
    Finalized,
    Failed,
}

/// Message read from the engine's stdout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineMessage {
    TransactionUpdate {
        id: TransactionId,
        status: UpdateStatus,
        #[serde(default)]
        signature: Option<Signature>,
        #[serde(default)]
        error: Option<String>,
    },
    Status {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Error {
        #[serde(default)]
        id: Option<TransactionId>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Why a well-formed message carries no update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoUpdate {
    /// Heartbeat or informational status.
    Status(Option<String>),
    /// Engine-level error not tied to a transaction.
    EngineError(String),
    /// A success status without the signature it needs.
    MissingSignature(TransactionId),
}

impl EngineMessage {
    /// Parse one inbound line.
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }

    /// Convert into a transaction update, if the message is one.
    pub fn into_update(self) -> Result<TransactionUpdate, NoUpdate> {
        match self {
            Self::TransactionUpdate {
                id,
                status,
                signature,
                error,
            } => {
                let outcome = match (status, signature) {
                    (UpdateStatus::Pending, _) => UpdateOutcome::Pending,
                    (UpdateStatus::Confirmed, Some(sig)) => UpdateOutcome::Confirmed(sig),
                    (UpdateStatus::Finalized, Some(sig)) => UpdateOutcome::Finalized(sig),
                    (UpdateStatus::Confirmed | UpdateStatus::Finalized, None) => {
                        return Err(NoUpdate::MissingSignature(id));
                    }
                    (UpdateStatus::Failed, _) => UpdateOutcome::Failed(
                        error.unwrap_or_else(|| "engine reported failure".to_string()),
                    ),
                };
                Ok(TransactionUpdate { id, outcome })
            }
            Self::Error { id: Some(id), error } => Ok(TransactionUpdate {
                id,
                outcome: UpdateOutcome::Failed(
                    error.unwrap_or_else(|| "engine error".to_string()),
                ),
            }),
            Self::Error { id: None, error } => Err(NoUpdate::EngineError(
                error.unwrap_or_else(|| "unspecified".to_string()),
            )),
            Self::Status { status, message } => Err(NoUpdate::Status(status.or(message))),
        }
    }
}
