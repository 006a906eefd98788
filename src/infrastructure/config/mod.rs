//! Infrastructure configuration modules.

pub mod admission;
pub mod engine;
pub mod logging;
pub mod pool;
pub mod settings;

pub use admission::AdmissionConfig;
pub use engine::EngineConfig;
pub use logging::LoggingConfig;
pub use pool::{EndpointConfig, ExhaustionPolicy, PoolConfig};
pub use settings::Config;
