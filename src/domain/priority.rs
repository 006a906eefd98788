//! Admission priority classes.

use std::fmt;

use serde::Deserialize;

/// Priority class of an outbound call.
///
/// - `Critical` executes immediately, bypassing the backlog.
/// - `High` jumps to the head of the backlog.
/// - `Normal` and `Low` are appended to the tail and drain in FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// True when the call skips the backlog entirely.
    #[must_use]
    pub const fn bypasses_queue(self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
