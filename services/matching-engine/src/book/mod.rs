//! Order book infrastructure module
//!
//! Contains price levels and the per-symbol order book.

pub mod order_book;
pub mod price_level;

pub use order_book::{OrderBook, OrderLocation, MAX_MATCH_ITERATIONS, MAX_PRICE_LEVELS};
pub use price_level::{PriceLevel, MAX_ORDERS_PER_LEVEL};
