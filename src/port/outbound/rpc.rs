//! Provider transport port.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Endpoint;
use crate::error::ProviderError;

/// Performs one JSON-RPC call against one endpoint.
///
/// Implementations classify failures into [`ProviderError`] variants so the
/// pool and the admission queue can do their bookkeeping; they never retry.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Call `method` with `params` on `endpoint` and return the `result` field.
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError>;
}
