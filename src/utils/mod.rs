//! Utility modules shared across the relay.

pub mod error;

pub use error::{GatewayError, Result};
