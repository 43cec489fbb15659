//! Bot configuration.

use std::time::Duration;

use crate::api::TESTNET_URL;
use crate::logging::LogConfig;

use super::operations::DEFAULT_ASSET;
use super::retry::RetryPolicy;

/// Connection, retry and logging settings.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// REST root of the futures API
    pub base_url: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// How long a signed request stays valid, in milliseconds
    pub recv_window_ms: u64,

    /// Retry policy shared by every exchange call
    pub retry: RetryPolicy,

    /// Asset whose balance is reported at startup
    pub asset: String,

    /// Log file and level
    pub log: LogConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: TESTNET_URL.to_string(),
            request_timeout: Duration::from_secs(20),
            recv_window_ms: 5_000,
            retry: RetryPolicy::default(), // 3 attempts, 3s apart
            asset: DEFAULT_ASSET.to_string(),
            log: LogConfig::default(), // logs/bot.log, 5 MB x 3 backups
        }
    }
}
