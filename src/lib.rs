//! # ModelRelay
//!
//! An OpenAI-compatible chat completion router. One HTTP surface in front of
//! any number of OpenAI-style providers: requests are routed by model name,
//! responses come back verbatim, streaming is relayed byte for byte, and
//! every completed request leaves exactly one usage event behind.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use modelrelay::{Config, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     server::run_server(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod server;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::directory::ProviderDirectory;
pub use core::forwarder::{ForwardReply, RequestForwarder};
pub use core::providers::{HttpProviderClient, ProviderClient, ProviderStatus};
pub use core::types::{ChatCompletionRequest, ChatMessage, ModelInfo, ModelList, TokenUsage};
pub use core::usage::{LogUsageSink, MemoryUsageSink, UsageEvent, UsageSink};
pub use utils::error::{GatewayError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
