//! The exchange surface the trading operations depend on.

use async_trait::async_trait;

use crate::models::OrderRequest;

use super::error::ExchangeError;
use super::types::{AssetBalance, LeverageResponse, OrderResponse};

/// Account and order endpoints of a futures exchange.
///
/// Every method is a single request/response round trip; retrying is left
/// to the caller.
#[async_trait]
pub trait FuturesExchange: Send + Sync {
    /// Connectivity check.
    async fn ping(&self) -> Result<(), ExchangeError>;

    /// Balances of every asset in the futures wallet.
    async fn balances(&self) -> Result<Vec<AssetBalance>, ExchangeError>;

    /// Change initial leverage for a symbol.
    async fn change_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageResponse, ExchangeError>;

    /// Submit a new order.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError>;
}

/// In-memory exchange for tests: replays scripted replies in order and
/// records every call it receives.
#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub type Script<T> = Mutex<VecDeque<Result<T, ExchangeError>>>;

    #[derive(Default)]
    pub struct ScriptedExchange {
        pub pings: Script<()>,
        pub balances: Script<Vec<AssetBalance>>,
        pub leverage: Script<LeverageResponse>,
        pub orders: Script<OrderResponse>,
        calls: Mutex<Vec<String>>,
        submitted: Mutex<Vec<OrderRequest>>,
    }

    impl ScriptedExchange {
        /// Calls received so far, e.g. `"leverage BTCUSDT 10"`, `"order LIMIT"`.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Every order passed to `create_order`, retries included.
        pub fn submitted(&self) -> Vec<OrderRequest> {
            self.submitted.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn next<T>(script: &Script<T>) -> Result<T, ExchangeError> {
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Decode("script exhausted".into())))
    }

    #[async_trait]
    impl FuturesExchange for ScriptedExchange {
        async fn ping(&self) -> Result<(), ExchangeError> {
            self.record("ping".into());
            next(&self.pings)
        }

        async fn balances(&self) -> Result<Vec<AssetBalance>, ExchangeError> {
            self.record("balances".into());
            next(&self.balances)
        }

        async fn change_leverage(
            &self,
            symbol: &str,
            leverage: u32,
        ) -> Result<LeverageResponse, ExchangeError> {
            self.record(format!("leverage {} {}", symbol, leverage));
            next(&self.leverage)
        }

        async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
            self.record(format!("order {}", order.order_type));
            self.submitted.lock().unwrap().push(order.clone());
            next(&self.orders)
        }
    }
}
