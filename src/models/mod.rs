//! Data models for futures orders.

mod order;

pub use order::{OrderRequest, OrderSide, OrderType};
#[cfg(test)]
pub use order::TimeInForce;
