//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - [`MockTransport`](transport::MockTransport), a scripted
//!   [`RpcTransport`](crate::port::RpcTransport) that records every call.
//! - [`engine`] - Fake execution engines written as shell scripts.
//! - [`domain`] - Builders for endpoints, params and signatures.
//! - [`config`] - Canonical test configurations (pool, admission, full config).

pub mod config;
pub mod domain;
pub mod engine;
pub mod transport;
