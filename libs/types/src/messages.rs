//! Engine message sum types
//!
//! Input and output messages are closed sets of four variants each, so the
//! engine dispatch is a single tag inspection. Every output carries its
//! symbol so downstream routing stays stateless.

use crate::order::Side;
use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// Pack a `(user_id, user_order_id)` pair into a single map key.
pub fn packed_key(user_id: u32, user_order_id: u32) -> u64 {
    ((user_id as u64) << 32) | user_order_id as u64
}

/// Order-entry request for a new limit or market order.
///
/// A price of zero denotes a market order. Quantity must be positive;
/// codecs reject zero-quantity orders before they reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: u32,
    pub user_order_id: u32,
    pub symbol: Symbol,
    pub price: u32,
    pub quantity: u32,
    pub side: Side,
}

impl NewOrder {
    /// Map key for the cancel index.
    pub fn packed_key(&self) -> u64 {
        packed_key(self.user_id, self.user_order_id)
    }
}

/// Cancel request addressed by client-visible order identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancel {
    pub user_id: u32,
    pub user_order_id: u32,
}

impl Cancel {
    /// Map key for the cancel index.
    pub fn packed_key(&self) -> u64 {
        packed_key(self.user_id, self.user_order_id)
    }
}

/// Request for the current best bid / best offer of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBookQuery {
    pub symbol: Symbol,
}

/// A request submitted to the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMessage {
    NewOrder(NewOrder),
    Cancel(Cancel),
    Flush,
    TopOfBookQuery(TopOfBookQuery),
}

impl InputMessage {
    /// The user id named by this request, or zero for administrative
    /// messages. Used to bind a user to its originating connection.
    pub fn user_id(&self) -> u32 {
        match self {
            InputMessage::NewOrder(msg) => msg.user_id,
            InputMessage::Cancel(msg) => msg.user_id,
            InputMessage::Flush | InputMessage::TopOfBookQuery(_) => 0,
        }
    }
}

/// A message emitted by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMessage {
    /// Order accepted; sent to the originating client.
    Ack {
        user_id: u32,
        user_order_id: u32,
        symbol: Symbol,
    },
    /// Cancel processed. Carries the resolved symbol, or
    /// [`Symbol::UNKNOWN`] when the order id had no mapping.
    CancelAck {
        user_id: u32,
        user_order_id: u32,
        symbol: Symbol,
    },
    /// Execution report. Buyer fields always come from the buy-side order
    /// regardless of which side was aggressive.
    Trade {
        symbol: Symbol,
        buy_user_id: u32,
        buy_user_order_id: u32,
        sell_user_id: u32,
        sell_user_order_id: u32,
        price: u32,
        quantity: u32,
    },
    /// Best bid/offer change for one side. `price == 0 && quantity == 0`
    /// encodes an elimination (the side has no orders left).
    TopOfBook {
        symbol: Symbol,
        side: Side,
        price: u32,
        quantity: u32,
    },
}

impl OutputMessage {
    pub fn ack(user_id: u32, user_order_id: u32, symbol: Symbol) -> Self {
        OutputMessage::Ack {
            user_id,
            user_order_id,
            symbol,
        }
    }

    pub fn cancel_ack(user_id: u32, user_order_id: u32, symbol: Symbol) -> Self {
        OutputMessage::CancelAck {
            user_id,
            user_order_id,
            symbol,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        symbol: Symbol,
        buy_user_id: u32,
        buy_user_order_id: u32,
        sell_user_id: u32,
        sell_user_order_id: u32,
        price: u32,
        quantity: u32,
    ) -> Self {
        OutputMessage::Trade {
            symbol,
            buy_user_id,
            buy_user_order_id,
            sell_user_id,
            sell_user_order_id,
            price,
            quantity,
        }
    }

    pub fn top_of_book(symbol: Symbol, side: Side, price: u32, quantity: u32) -> Self {
        OutputMessage::TopOfBook {
            symbol,
            side,
            price,
            quantity,
        }
    }

    /// A side transitioning to empty, reported as price 0 / quantity 0.
    pub fn top_of_book_eliminated(symbol: Symbol, side: Side) -> Self {
        OutputMessage::TopOfBook {
            symbol,
            side,
            price: 0,
            quantity: 0,
        }
    }

    /// The symbol carried by this message.
    pub fn symbol(&self) -> Symbol {
        match self {
            OutputMessage::Ack { symbol, .. }
            | OutputMessage::CancelAck { symbol, .. }
            | OutputMessage::Trade { symbol, .. }
            | OutputMessage::TopOfBook { symbol, .. } => *symbol,
        }
    }
}

/// Cached `(price, quantity)` pair per side for top-of-book change
/// detection. Zero price and quantity mean the side is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopOfBookSnapshot {
    pub bid_price: u32,
    pub bid_quantity: u64,
    pub ask_price: u32,
    pub ask_quantity: u64,
}

impl TopOfBookSnapshot {
    pub const EMPTY: TopOfBookSnapshot = TopOfBookSnapshot {
        bid_price: 0,
        bid_quantity: 0,
        ask_price: 0,
        ask_quantity: 0,
    };

    pub fn has_bid(&self) -> bool {
        self.bid_price != 0
    }

    pub fn has_ask(&self) -> bool {
        self.ask_price != 0
    }

    /// Whether the bid side differs from a previous snapshot.
    pub fn bid_changed(&self, prev: &TopOfBookSnapshot) -> bool {
        self.bid_price != prev.bid_price || self.bid_quantity != prev.bid_quantity
    }

    /// Whether the ask side differs from a previous snapshot.
    pub fn ask_changed(&self, prev: &TopOfBookSnapshot) -> bool {
        self.ask_price != prev.ask_price || self.ask_quantity != prev.ask_quantity
    }
}
