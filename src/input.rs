//! Interactive order entry.
//!
//! Values can be pre-filled from command-line flags; whatever is missing is
//! prompted for. Every value goes through the same validation, and the first
//! invalid one aborts the whole entry.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{OrderSide, OrderType};

/// Rejected user input. Terminates the program before any order is sent.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid side")]
    InvalidSide,

    #[error("Invalid order type")]
    InvalidOrderType,

    #[error("Quantity must be a positive number")]
    InvalidQuantity,

    #[error("Invalid leverage")]
    InvalidLeverage,

    #[error("Invalid price")]
    InvalidPrice,

    #[error("Input closed before {0} was entered")]
    Closed(&'static str),

    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
}

/// Values supplied up front, as raw text.
#[derive(Debug, Clone, Default)]
pub struct Prefilled {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub quantity: Option<String>,
    pub leverage: Option<String>,
    pub price: Option<String>,
}

/// How the order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit { price: Decimal },
}

/// Validated order entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTicket {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub quantity: Decimal,
    pub leverage: u32,
}

/// Line-oriented prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read one trimmed line.
    pub fn ask(&mut self, field: &'static str, prompt: &str) -> Result<String, InputError> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::Closed(field));
        }
        Ok(line.trim().to_string())
    }

    fn value(
        &mut self,
        prefilled: &Option<String>,
        field: &'static str,
        prompt: &str,
    ) -> Result<String, InputError> {
        match prefilled {
            Some(value) => Ok(value.trim().to_string()),
            None => self.ask(field, prompt),
        }
    }
}

/// Collect and validate an order in prompt order: symbol, side, type,
/// quantity, leverage, then price for LIMIT orders.
pub fn collect_ticket<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    prefilled: &Prefilled,
) -> Result<OrderTicket, InputError> {
    let symbol = prompter
        .value(&prefilled.symbol, "symbol", "Enter symbol (e.g., BTCUSDT): ")?
        .to_uppercase();

    let side = parse_side(&prompter.value(&prefilled.side, "side", "Enter side (BUY/SELL): ")?)?;

    let order_type = parse_order_type(&prompter.value(
        &prefilled.order_type,
        "order type",
        "Enter order type (MARKET/LIMIT): ",
    )?)?;

    let quantity = parse_quantity(&prompter.value(&prefilled.quantity, "quantity", "Enter quantity: ")?)?;

    let leverage = parse_leverage(&prompter.value(
        &prefilled.leverage,
        "leverage",
        "Enter leverage (e.g., 5, 10): ",
    )?)?;

    let kind = match order_type {
        OrderType::Market => OrderKind::Market,
        OrderType::Limit => OrderKind::Limit {
            price: parse_price(&prompter.value(&prefilled.price, "price", "Enter limit price: ")?)?,
        },
    };

    Ok(OrderTicket {
        symbol,
        side,
        kind,
        quantity,
        leverage,
    })
}

pub fn parse_side(raw: &str) -> Result<OrderSide, InputError> {
    raw.parse().map_err(|_| InputError::InvalidSide)
}

pub fn parse_order_type(raw: &str) -> Result<OrderType, InputError> {
    raw.parse().map_err(|_| InputError::InvalidOrderType)
}

pub fn parse_quantity(raw: &str) -> Result<Decimal, InputError> {
    positive_decimal(raw).ok_or(InputError::InvalidQuantity)
}

pub fn parse_price(raw: &str) -> Result<Decimal, InputError> {
    positive_decimal(raw).ok_or(InputError::InvalidPrice)
}

pub fn parse_leverage(raw: &str) -> Result<u32, InputError> {
    match raw.trim().parse::<u32>() {
        Ok(leverage) if leverage > 0 => Ok(leverage),
        _ => Err(InputError::InvalidLeverage),
    }
}

/// Accepts plain (`0.01`) and scientific (`1e-3`) notation.
fn positive_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .filter(|value| *value > Decimal::ZERO)
}
