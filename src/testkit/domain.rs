//! Builders for domain primitives used across tests.

use rust_decimal::Decimal;

use crate::domain::{Endpoint, EndpointId, Signature, SubmitParams};

/// Well-formed signature returned by fake engines and the mock transport.
pub const SIGNATURE: &str =
    "2Ana1pUpv2ZbMVkwF5FXapYeBEjdxDatLn7nvJkhgTSXbs59SyZSx866bXirPgj8QQVB57uxHJBG1YFvkRbFj4T";

/// Create an endpoint at table position `index` with the given weight.
///
/// Priority follows the index so the first endpoint is the natural primary.
pub fn endpoint(index: usize, name: &str, weight: u32) -> Endpoint {
    Endpoint::try_new(
        EndpointId::new(index),
        name,
        format!("https://{name}.example"),
        None,
        index as u32 + 1,
        weight,
    )
    .expect("valid test endpoint")
}

/// Build a table from `(name, weight)` pairs.
pub fn endpoints(spec: &[(&str, u32)]) -> Vec<Endpoint> {
    spec.iter()
        .enumerate()
        .map(|(i, (name, weight))| endpoint(i, name, *weight))
        .collect()
}

/// A valid swap submission of 1 unit.
pub fn params() -> SubmitParams {
    SubmitParams::new("SOL", "USDC", Decimal::ONE, "wallet-test")
}

/// The canonical test signature.
pub fn signature() -> Signature {
    Signature::new(SIGNATURE)
}
