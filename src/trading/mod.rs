//! Trading layer: retrying exchange access and the operations built on it.

mod config;
mod operations;
mod retry;

pub use config::BotConfig;
pub use operations::{TradingOperations, DEFAULT_ASSET};
pub use retry::RetryPolicy;
