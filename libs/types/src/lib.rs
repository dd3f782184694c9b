//! Core types for the matching engine
//!
//! Shared vocabulary used across the engine, the wire codecs, and the
//! transport: packed symbols, order attributes, the input/output message
//! sum types, and the engine error taxonomy.
//!
//! # Modules
//! - `symbol`: 8-byte packed symbol identifiers
//! - `order`: side and order-type enums
//! - `messages`: input/output message variants and the TOB snapshot
//! - `errors`: engine error taxonomy

pub mod errors;
pub mod messages;
pub mod order;
pub mod symbol;

pub use errors::EngineError;
pub use messages::{
    packed_key, Cancel, InputMessage, NewOrder, OutputMessage, TopOfBookQuery, TopOfBookSnapshot,
};
pub use order::{OrderType, Side};
pub use symbol::{Symbol, SYMBOL_SIZE};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::messages::*;
    pub use crate::order::*;
    pub use crate::symbol::*;
}
