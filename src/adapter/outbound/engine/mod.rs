//! External execution engine adapter.

mod bridge;
pub mod protocol;

pub use bridge::{EngineBridge, EngineState};
