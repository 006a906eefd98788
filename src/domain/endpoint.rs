//! Remote provider endpoints and their health bookkeeping.

use tokio::time::Instant;

use super::error::DomainError;
use super::id::EndpointId;

/// A configured remote provider.
///
/// Created once when the pool is built and never destroyed; only its
/// [`EndpointHealth`] changes over time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    id: EndpointId,
    name: String,
    url: String,
    ws_url: Option<String>,
    priority: u32,
    weight: u32,
}

impl Endpoint {
    /// Create an endpoint, rejecting a zero weight.
    pub fn try_new(
        id: EndpointId,
        name: impl Into<String>,
        url: impl Into<String>,
        ws_url: Option<String>,
        priority: u32,
        weight: u32,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let url = url.into();
        if name.is_empty() {
            return Err(DomainError::EmptyField { field: "name" });
        }
        if url.is_empty() {
            return Err(DomainError::EmptyField { field: "url" });
        }
        if weight == 0 {
            return Err(DomainError::ZeroWeight);
        }
        Ok(Self {
            id,
            name,
            url,
            ws_url,
            priority,
            weight,
        })
    }

    #[must_use]
    pub const fn id(&self) -> EndpointId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Streaming-channel URL, if the provider offers one.
    #[must_use]
    pub fn ws_url(&self) -> Option<&str> {
        self.ws_url.as_deref()
    }

    /// Configured priority; lower values are preferred for the write primary.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }
}

/// Mutable health state of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointHealth {
    /// Whether the endpoint may be selected.
    pub healthy: bool,
    /// Errors since the last reset or recovery.
    pub error_count: u32,
    /// Total number of times this endpoint was selected.
    pub request_count: u64,
    /// When the endpoint was last selected.
    pub last_used_at: Option<Instant>,
    /// When an unhealthy endpoint is due to be restored.
    pub recover_at: Option<Instant>,
    /// A half-open probe has been handed out and not yet reported.
    pub probing: bool,
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self {
            healthy: true,
            error_count: 0,
            request_count: 0,
            last_used_at: None,
            recover_at: None,
            probing: false,
        }
    }
}

impl EndpointHealth {
    /// Restore to healthy with a cleared error count; usage counters are kept.
    pub fn restore(&mut self) {
        self.healthy = true;
        self.error_count = 0;
        self.recover_at = None;
        self.probing = false;
    }
}

/// Point-in-time view of an endpoint for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSnapshot {
    pub name: String,
    pub url: String,
    pub weight: u32,
    pub healthy: bool,
    pub error_count: u32,
    pub request_count: u64,
    pub last_used_at: Option<Instant>,
    pub is_write_primary: bool,
}
