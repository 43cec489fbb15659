//! Binance USDⓈ-M Futures REST client.
//!
//! Covers only the endpoints the CLI needs:
//! - `GET  /fapi/v1/ping` (public)
//! - `GET  /fapi/v2/balance` (signed)
//! - `POST /fapi/v1/leverage` (signed)
//! - `POST /fapi/v1/order` (signed)
//!
//! Signed endpoints carry `recvWindow`, `timestamp` and an HMAC-SHA256
//! `signature` of the query string, plus the `X-MBX-APIKEY` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::models::OrderRequest;

use super::error::ExchangeError;
use super::exchange::FuturesExchange;
use super::types::{AssetBalance, LeverageResponse, OrderResponse};

/// Futures testnet base URL.
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// API key/secret pair. Passed through verbatim, never validated.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Hex-encoded HMAC-SHA256 of `payload` keyed with the API secret.
    pub fn sign(&self, payload: &str) -> Result<String, ExchangeError> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Signing(e.to_string()))?;

        mac.update(payload.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// REST client for the futures API.
pub struct FuturesClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    recv_window: u64,
}

impl FuturesClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `credentials` - API key and secret
    /// * `base_url` - REST root, e.g. [`TESTNET_URL`]
    /// * `timeout` - Per-request timeout
    /// * `recv_window` - Milliseconds a signed request stays valid
    pub fn new(
        credentials: Credentials,
        base_url: &str,
        timeout: Duration,
        recv_window: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window,
        })
    }

    /// Build the URL for a signed request at the given timestamp (ms).
    fn signed_url(
        &self,
        path: &str,
        params: &[(&str, String)],
        timestamp: i64,
    ) -> Result<Url, ExchangeError> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter())
            .append_pair("recvWindow", &self.recv_window.to_string())
            .append_pair("timestamp", &timestamp.to_string());

        let query = url.query().unwrap_or_default().to_string();
        let signature = self.credentials.sign(&query)?;
        url.query_pairs_mut().append_pair("signature", &signature);

        Ok(url)
    }

    fn url(&self, path: &str) -> Result<Url, ExchangeError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ExchangeError::InvalidRequest(format!("{}{}: {}", self.base_url, path, e)))
    }

    async fn public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        let url = self.url(path)?;
        debug!(url = %url, "Public request");

        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = self.signed_url(path, params, Utc::now().timestamp_millis())?;
        debug!(method = %method, path = %path, "Signed request");

        let response = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExchangeError::from_response(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FuturesExchange for FuturesClient {
    async fn ping(&self) -> Result<(), ExchangeError> {
        let _: serde_json::Value = self.public("/fapi/v1/ping").await?;
        Ok(())
    }

    async fn balances(&self) -> Result<Vec<AssetBalance>, ExchangeError> {
        self.signed(Method::GET, "/fapi/v2/balance", &[]).await
    }

    async fn change_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageResponse, ExchangeError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("leverage", leverage.to_string()),
        ];
        let raw = self.signed(Method::POST, "/fapi/v1/leverage", &params).await?;
        LeverageResponse::from_raw(raw)
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.signed(Method::POST, "/fapi/v1/order", &order.to_params())
            .await
    }
}
