//! Switchyard - resilient dispatch core for unreliable RPC providers.
//!
//! The crate sits between transaction-producing code and a set of redundant
//! JSON-RPC providers, optionally fronted by an external execution engine
//! process.
//!
//! # Architecture
//!
//! - **`infrastructure::pool`** - Health-aware endpoint pool
//!   - weighted, error-aware read selection
//!   - writes pinned to one primary
//!   - fixed-deadline recovery and a configurable exhaustion policy
//!
//! - **`infrastructure::admission`** - Admission queue
//!   - per-second, per-minute and concurrency ceilings
//!   - priority classes with critical bypass
//!   - adaptive throttle after rate-limit responses, bounded backlog
//!
//! - **`application::supervisor`** - Transaction supervisor
//!   - engine bridge over a line protocol on stdin/stdout
//!   - direct fallback through the queue and the pool
//!
//! # Modules
//!
//! - [`domain`] - Plain data: endpoints, priorities, transactions
//! - [`port`] - Traits at the I/O seams
//! - [`adapter`] - HTTP transport and engine bridge
//! - [`infrastructure`] - Configuration, pool, admission queue
//! - [`application`] - Dispatcher, direct path, supervisor, [`DispatchCore`](application::DispatchCore)
//! - [`error`] - Error types and stable error codes
//! - [`cli`] - Operator command line
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use switchyard::application::DispatchCore;
//! use switchyard::domain::SubmitParams;
//! use switchyard::infrastructure::config::Config;
//!
//! # async fn demo() -> switchyard::error::Result<()> {
//! let core = DispatchCore::from_config(Config::load("config.toml")?)?;
//! core.start();
//! let params = SubmitParams::new("SOL", "USDC", Decimal::ONE, "wallet");
//! let signature = core.submit(params).await?;
//! println!("{signature}");
//! core.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
