//! API response types for the Binance USDⓈ-M Futures REST API.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::error::ExchangeError;

/// One asset row from `GET /fapi/v2/balance`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub available_balance: Option<Decimal>,
    #[serde(default)]
    pub cross_wallet_balance: Option<Decimal>,
    #[serde(default)]
    pub cross_un_pnl: Option<Decimal>,
}

impl AssetBalance {
    /// Margin-available balance when reported, otherwise the wallet balance.
    pub fn spendable(&self) -> Decimal {
        self.available_balance
            .or(self.balance)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Response from `POST /fapi/v1/leverage`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageResponse {
    pub symbol: String,
    pub leverage: u32,
    #[serde(default)]
    pub max_notional_value: Option<String>,
    /// Body exactly as the exchange sent it
    #[serde(skip)]
    pub raw: Value,
}

impl LeverageResponse {
    /// Decode the typed fields and keep the full body alongside them.
    pub fn from_raw(raw: Value) -> Result<Self, ExchangeError> {
        let mut response: Self = serde_json::from_value(raw.clone())?;
        response.raw = raw;
        Ok(response)
    }
}

/// Response from `POST /fapi/v1/order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    #[serde(default)]
    pub time_in_force: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
    #[serde(default)]
    pub orig_qty: Option<Decimal>,
    #[serde(default)]
    pub executed_qty: Option<Decimal>,
    #[serde(default)]
    pub update_time: Option<i64>,
}
