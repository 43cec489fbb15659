//! Account and order operations.
//!
//! Each operation makes exactly one exchange call through the
//! [`RetryingClient`], reports the outcome to the user and the log, and
//! swallows failures: nothing here returns an error or panics.

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::api::{ExchangeError, FuturesExchange, OrderResponse};
use crate::models::{OrderRequest, OrderSide, OrderType};

use super::retry::{RetryPolicy, RetryingClient};

/// Asset whose balance is reported by default.
pub const DEFAULT_ASSET: &str = "USDT";

/// Named, independent operations against a futures exchange.
pub struct TradingOperations<E> {
    client: RetryingClient<E>,
}

impl<E: FuturesExchange> TradingOperations<E> {
    pub fn new(exchange: E, policy: RetryPolicy) -> Self {
        Self {
            client: RetryingClient::new(exchange, policy),
        }
    }

    #[cfg(test)]
    pub fn exchange(&self) -> &E {
        self.client.exchange()
    }

    /// Ping the exchange.
    pub async fn test_connectivity(&self) {
        match self.client.execute(|exchange| exchange.ping()).await {
            Ok(()) => {
                println!("Connected to Binance Futures Testnet");
                info!("Connection successful");
            }
            Err(e) => {
                println!("Connection failed: {}", e);
                error!(error = %e, "Connection failed");
            }
        }
    }

    /// Available balance of `asset`, or zero when it is missing or the call fails.
    pub async fn fetch_available_balance(&self, asset: &str) -> Decimal {
        let balances = match self.client.execute(|exchange| exchange.balances()).await {
            Ok(balances) => balances,
            Err(e) => {
                println!("Error fetching balance: {}", e);
                error!(asset = %asset, error = %e, "Balance fetch failed");
                return Decimal::ZERO;
            }
        };

        match balances.iter().find(|row| row.asset == asset) {
            Some(row) => {
                let balance = row.spendable();
                println!("{} Balance: {}", asset, balance);
                info!(
                    asset = %asset,
                    balance = %balance,
                    cross_wallet_balance = ?row.cross_wallet_balance,
                    cross_un_pnl = ?row.cross_un_pnl,
                    "Balance fetched"
                );
                balance
            }
            None => {
                println!("{} balance not found", asset);
                warn!(asset = %asset, "Balance not found");
                Decimal::ZERO
            }
        }
    }

    /// Change initial leverage for `symbol`.
    pub async fn set_leverage(&self, symbol: &str, leverage: u32) {
        let result = self
            .client
            .execute(|exchange| exchange.change_leverage(symbol, leverage))
            .await;

        match result {
            Ok(response) => {
                println!("Leverage set to {}x for {}", leverage, symbol);
                info!(
                    symbol = %response.symbol,
                    leverage = response.leverage,
                    max_notional_value = ?response.max_notional_value,
                    response = %response.raw,
                    "Leverage set"
                );
            }
            Err(e) => {
                println!("Error setting leverage: {}", e);
                error!(symbol = %symbol, leverage = leverage, error = %e, "Leverage change failed");
            }
        }
    }

    /// Place a MARKET order.
    pub async fn place_market_order(&self, symbol: &str, side: OrderSide, quantity: Decimal) {
        let order = OrderRequest::market(symbol, side, quantity);
        let result = self.submit(&order).await;
        report_order(&order, result);
    }

    /// Place a good-till-cancelled LIMIT order.
    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) {
        let order = OrderRequest::limit(symbol, side, quantity, price);
        let result = self.submit(&order).await;
        report_order(&order, result);
    }

    async fn submit(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.client
            .execute(|exchange| exchange.create_order(order))
            .await
    }
}

fn report_order(order: &OrderRequest, result: Result<OrderResponse, ExchangeError>) {
    let kind = match order.order_type {
        OrderType::Market => "Market",
        OrderType::Limit => "Limit",
    };

    match result {
        Ok(response) => {
            match order.order_type {
                OrderType::Market => println!("Market order executed"),
                OrderType::Limit => println!("Limit order placed"),
            }
            println!(
                "  Order ID: {}  Status: {}  Client ID: {}",
                response.order_id, response.status, response.client_order_id
            );
            println!(
                "  {} {} {}  Qty: {}  Executed: {}  Price: {}  Avg: {}",
                response.symbol,
                response.side,
                response.order_type,
                display_or_dash(response.orig_qty),
                display_or_dash(response.executed_qty),
                display_or_dash(response.price),
                display_or_dash(response.avg_price),
            );
            info!(
                kind = kind,
                order_id = response.order_id,
                symbol = %response.symbol,
                side = %response.side,
                order_type = %response.order_type,
                status = %response.status,
                time_in_force = ?response.time_in_force,
                price = ?response.price,
                avg_price = ?response.avg_price,
                orig_qty = ?response.orig_qty,
                executed_qty = ?response.executed_qty,
                update_time = ?response.update_time,
                client_order_id = %response.client_order_id,
                "Order accepted"
            );
        }
        Err(e) => {
            println!("{} order failed: {}", kind, e);
            error!(
                kind = kind,
                symbol = %order.symbol,
                side = %order.side,
                client_order_id = %order.client_order_id,
                error = %e,
                "Order failed"
            );
        }
    }
}

fn display_or_dash(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scripted::ScriptedExchange;
    use crate::api::{AssetBalance, LeverageResponse};
    use crate::logging::capture::CapturedLogs;
    use crate::models::TimeInForce;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tracing::Level;

    fn operations(exchange: ScriptedExchange) -> TradingOperations<ScriptedExchange> {
        TradingOperations::new(exchange, RetryPolicy::new(3, Duration::ZERO))
    }

    fn row(asset: &str, balance: Option<Decimal>, available: Option<Decimal>) -> AssetBalance {
        AssetBalance {
            asset: asset.to_string(),
            balance,
            available_balance: available,
            cross_wallet_balance: None,
            cross_un_pnl: None,
        }
    }

    fn accepted(order_type: &str) -> OrderResponse {
        serde_json::from_value(serde_json::json!({
            "orderId": 42,
            "symbol": "BTCUSDT",
            "status": "NEW",
            "clientOrderId": "futbot-test",
            "type": order_type,
            "side": "BUY",
            "origQty": "0.010",
            "executedQty": "0.000",
            "updateTime": 1717000000000u64
        }))
        .unwrap()
    }

    fn timeout() -> ExchangeError {
        ExchangeError::Timeout("read timed out".into())
    }

    #[tokio::test]
    async fn test_connectivity_success_and_failure_are_logged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange.pings.lock().unwrap().extend([
            Ok(()),
            Err(timeout()),
            Err(timeout()),
            Err(timeout()),
        ]);
        let ops = operations(exchange);

        ops.test_connectivity().await;
        ops.test_connectivity().await;

        assert_eq!(logs.count(Level::INFO, "Connection successful"), 1);
        assert_eq!(logs.count(Level::ERROR, "Connection failed"), 1);
        assert_eq!(logs.count(Level::WARN, "Network error, retrying"), 2);
        assert_eq!(ops.exchange().calls().len(), 4);
    }

    #[tokio::test]
    async fn test_balance_prefers_available_over_wallet() {
        let exchange = ScriptedExchange::default();
        exchange.balances.lock().unwrap().push_back(Ok(vec![
            row("BNB", Some(dec!(1)), Some(dec!(1))),
            row("USDT", Some(dec!(15000)), Some(dec!(14250.75))),
        ]));
        let ops = operations(exchange);

        assert_eq!(ops.fetch_available_balance("USDT").await, dec!(14250.75));
    }

    #[tokio::test]
    async fn test_balance_falls_back_to_wallet_balance() {
        let exchange = ScriptedExchange::default();
        exchange
            .balances
            .lock()
            .unwrap()
            .push_back(Ok(vec![row("USDT", Some(dec!(500.5)), None)]));
        let ops = operations(exchange);

        assert_eq!(ops.fetch_available_balance(DEFAULT_ASSET).await, dec!(500.5));
    }

    #[tokio::test]
    async fn test_missing_asset_warns_and_returns_zero() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange
            .balances
            .lock()
            .unwrap()
            .push_back(Ok(vec![row("BTC", Some(dec!(2)), None)]));
        let ops = operations(exchange);

        assert_eq!(ops.fetch_available_balance("USDT").await, Decimal::ZERO);
        assert_eq!(logs.count(Level::WARN, "Balance not found"), 1);
        assert_eq!(logs.count(Level::ERROR, ""), 0);
    }

    #[tokio::test]
    async fn test_balance_failure_returns_zero() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange.balances.lock().unwrap().push_back(Err(ExchangeError::Api {
            code: -2015,
            msg: "Invalid API-key, IP, or permissions for action.".into(),
        }));
        let ops = operations(exchange);

        assert_eq!(ops.fetch_available_balance("USDT").await, Decimal::ZERO);
        assert_eq!(logs.count(Level::ERROR, "Balance fetch failed"), 1);
        assert_eq!(ops.exchange().calls(), vec!["balances"]);
    }

    #[tokio::test]
    async fn test_failed_leverage_does_not_block_order() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange.leverage.lock().unwrap().push_back(Err(ExchangeError::Api {
            code: -4028,
            msg: "Leverage 200 is not valid".into(),
        }));
        exchange.orders.lock().unwrap().push_back(Ok(accepted("MARKET")));
        let ops = operations(exchange);

        ops.set_leverage("BTCUSDT", 200).await;
        ops.place_market_order("BTCUSDT", OrderSide::Buy, dec!(0.01)).await;

        assert_eq!(
            ops.exchange().calls(),
            vec!["leverage BTCUSDT 200", "order MARKET"]
        );
        assert_eq!(logs.count(Level::ERROR, "Leverage change failed"), 1);
        assert_eq!(logs.count(Level::INFO, "Order accepted"), 1);
        assert_eq!(logs.count(Level::INFO, "executed_qty=Some(0.000)"), 1);
    }

    #[tokio::test]
    async fn test_leverage_success_logs_response() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange.leverage.lock().unwrap().push_back(LeverageResponse::from_raw(
            serde_json::json!({
                "symbol": "ETHUSDT",
                "leverage": 10,
                "maxNotionalValue": "1000000",
                "notionalCap": "5000000"
            }),
        ));
        let ops = operations(exchange);

        ops.set_leverage("ETHUSDT", 10).await;

        assert_eq!(logs.count(Level::INFO, "Leverage set"), 1);
        assert_eq!(logs.count(Level::INFO, "\"notionalCap\":\"5000000\""), 1);
    }

    #[tokio::test]
    async fn test_limit_order_is_gtc_with_price() {
        let exchange = ScriptedExchange::default();
        exchange.orders.lock().unwrap().push_back(Ok(accepted("LIMIT")));
        let ops = operations(exchange);

        ops.place_limit_order("BTCUSDT", OrderSide::Sell, dec!(0.5), dec!(65000))
            .await;

        let submitted = ops.exchange().submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].order_type, OrderType::Limit);
        assert_eq!(submitted[0].side, OrderSide::Sell);
        assert_eq!(submitted[0].price, Some(dec!(65000)));
        assert_eq!(submitted[0].time_in_force, Some(TimeInForce::Gtc));
    }

    #[tokio::test]
    async fn test_market_order_has_no_price() {
        let exchange = ScriptedExchange::default();
        exchange.orders.lock().unwrap().push_back(Ok(accepted("MARKET")));
        let ops = operations(exchange);

        ops.place_market_order("BTCUSDT", OrderSide::Buy, dec!(0.01)).await;

        let submitted = ops.exchange().submitted();
        assert_eq!(submitted[0].order_type, OrderType::Market);
        assert_eq!(submitted[0].price, None);
        assert_eq!(submitted[0].time_in_force, None);
    }

    #[tokio::test]
    async fn test_rejected_order_is_not_retried() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let exchange = ScriptedExchange::default();
        exchange.orders.lock().unwrap().push_back(Err(ExchangeError::Api {
            code: -2019,
            msg: "Margin is insufficient.".into(),
        }));
        let ops = operations(exchange);

        ops.place_market_order("BTCUSDT", OrderSide::Buy, dec!(100)).await;

        assert_eq!(ops.exchange().calls(), vec!["order MARKET"]);
        assert_eq!(logs.count(Level::ERROR, "Order failed"), 1);
        assert_eq!(logs.count(Level::WARN, ""), 0);
    }

    #[tokio::test]
    async fn test_order_retried_after_connection_reset() {
        let exchange = ScriptedExchange::default();
        exchange.orders.lock().unwrap().extend([
            Err(ExchangeError::Connect("connection reset".into())),
            Ok(accepted("LIMIT")),
        ]);
        let ops = operations(exchange);

        ops.place_limit_order("BTCUSDT", OrderSide::Buy, dec!(1), dec!(60000))
            .await;

        let submitted = ops.exchange().submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].client_order_id, submitted[1].client_order_id);
    }
}
