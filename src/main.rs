//! Binance Futures Testnet Trading Bot
//!
//! Checks connectivity, reports the account balance, sets leverage and
//! places a single market or limit order entered at the prompt.

mod api;
mod input;
mod logging;
mod models;
mod trading;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::api::{Credentials, FuturesClient, FuturesExchange, TESTNET_URL};
use crate::input::{InputError, OrderKind, OrderTicket, Prefilled, Prompter};
use crate::logging::{parse_level, LogConfig};
use crate::trading::{BotConfig, RetryPolicy, TradingOperations, DEFAULT_ASSET};

/// Binance Futures testnet order CLI.
#[derive(Parser)]
#[command(name = "futbot")]
#[command(about = "Set leverage and place one order on the Binance Futures testnet", long_about = None)]
struct Cli {
    /// API key
    #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// API secret
    #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
    api_secret: String,

    /// Futures REST base URL
    #[arg(long, env = "BINANCE_FUTURES_URL", default_value = TESTNET_URL)]
    base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory for bot.log and its rotated backups
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Asset whose balance is reported
    #[arg(long, default_value = DEFAULT_ASSET)]
    asset: String,

    /// Attempts per request on network errors
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value = "3")]
    retry_delay: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "20")]
    timeout: u64,

    /// Symbol, e.g. BTCUSDT (prompted if omitted)
    #[arg(long)]
    symbol: Option<String>,

    /// BUY or SELL (prompted if omitted)
    #[arg(long)]
    side: Option<String>,

    /// MARKET or LIMIT (prompted if omitted)
    #[arg(long)]
    order_type: Option<String>,

    /// Order quantity (prompted if omitted)
    #[arg(long, allow_hyphen_values = true)]
    quantity: Option<String>,

    /// Leverage multiplier (prompted if omitted)
    #[arg(long, allow_hyphen_values = true)]
    leverage: Option<String>,

    /// Limit price, LIMIT orders only (prompted if omitted)
    #[arg(long, allow_hyphen_values = true)]
    price: Option<String>,
}

impl Cli {
    fn config(&self) -> BotConfig {
        BotConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            retry: RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay)),
            asset: self.asset.to_uppercase(),
            log: LogConfig {
                dir: self.log_dir.clone(),
                level: parse_level(&self.log_level),
                ..LogConfig::default()
            },
            ..BotConfig::default()
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(&self.api_key, &self.api_secret)
    }

    fn prefilled(&self) -> Prefilled {
        Prefilled {
            symbol: self.symbol.clone(),
            side: self.side.clone(),
            order_type: self.order_type.clone(),
            quantity: self.quantity.clone(),
            leverage: self.leverage.clone(),
            price: self.price.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // .env must be loaded before clap reads the environment
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.config();

    let _log_guard = logging::init(&config.log)?;

    let client = FuturesClient::new(
        cli.credentials(),
        &config.base_url,
        config.request_timeout,
        config.recv_window_ms,
    )?;
    info!(base_url = %config.base_url, "Futures client initialized");

    let ops = TradingOperations::new(client, config.retry);

    println!("\n--- Binance Futures Testnet Trading Bot ---\n");

    ops.test_connectivity().await;
    ops.fetch_available_balance(&config.asset).await;

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    if let Err(e) = run_order_entry(&ops, &mut prompter, &cli.prefilled()).await {
        println!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    println!("\nOrder process completed.");
    Ok(ExitCode::SUCCESS)
}

/// Collect a complete ticket, then place it. Invalid input returns before
/// anything is sent to the exchange.
async fn run_order_entry<E, R, W>(
    ops: &TradingOperations<E>,
    prompter: &mut Prompter<R, W>,
    prefilled: &Prefilled,
) -> Result<(), InputError>
where
    E: FuturesExchange,
    R: BufRead,
    W: Write,
{
    let ticket = input::collect_ticket(prompter, prefilled)?;
    place_ticket(ops, &ticket).await;
    Ok(())
}

/// Set leverage, then place the order whether or not leverage was accepted.
async fn place_ticket<E: FuturesExchange>(ops: &TradingOperations<E>, ticket: &OrderTicket) {
    info!(
        symbol = %ticket.symbol,
        side = %ticket.side,
        kind = ?ticket.kind,
        quantity = %ticket.quantity,
        leverage = ticket.leverage,
        "Order entered"
    );

    ops.set_leverage(&ticket.symbol, ticket.leverage).await;

    match ticket.kind {
        OrderKind::Market => {
            ops.place_market_order(&ticket.symbol, ticket.side, ticket.quantity)
                .await
        }
        OrderKind::Limit { price } => {
            ops.place_limit_order(&ticket.symbol, ticket.side, ticket.quantity, price)
                .await
        }
    }
}
