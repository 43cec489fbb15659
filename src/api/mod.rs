//! Binance USDⓈ-M Futures API client and the exchange seam it implements.

mod error;
mod exchange;
mod futures_client;
mod types;

pub use error::ExchangeError;
pub use exchange::FuturesExchange;
#[cfg(test)]
pub(crate) use exchange::scripted;
pub use futures_client::{Credentials, FuturesClient, TESTNET_URL};
pub use types::*;
