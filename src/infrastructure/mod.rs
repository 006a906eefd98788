//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic. This layer handles configuration, provider health and
//! outbound call pacing.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading and validation
//! - [`pool`] - Health-aware endpoint pool
//! - [`admission`] - Rate-limited, priority-aware admission queue

pub mod admission;
pub mod config;
pub mod pool;
