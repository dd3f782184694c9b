//! Simulation harness
//!
//! Drives a matching engine with generated flow while maintaining an
//! independent shadow ledger of open quantity per order. After every
//! message the harness reconciles the ledger against the engine's books
//! and runs the structural invariant checks, so any conservation bug
//! surfaces at the message that introduced it.

use std::collections::HashMap;

use matching_engine::{MatchingEngine, PriceLevel};
use serde::{Deserialize, Serialize};
use types::{packed_key, InputMessage, OrderType, OutputMessage, Symbol};

/// Aggregate counters for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    pub messages: u64,
    pub acks: u64,
    pub cancel_acks: u64,
    pub unknown_cancels: u64,
    pub trades: u64,
    pub traded_quantity: u64,
    pub tob_updates: u64,
    pub discarded_market_quantity: u64,
}

/// Shadow record of one admitted order's open quantity.
#[derive(Debug, Clone)]
struct ShadowOrder {
    symbol: Symbol,
    remaining: u32,
}

/// Engine plus oracle state.
pub struct Harness {
    engine: MatchingEngine,
    outputs: Vec<OutputMessage>,
    shadow: HashMap<u64, ShadowOrder>,
    report: SimReport,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            engine: MatchingEngine::new(),
            outputs: Vec::with_capacity(64),
            shadow: HashMap::new(),
            report: SimReport::default(),
        }
    }

    pub fn report(&self) -> &SimReport {
        &self.report
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Process one message, reconcile the shadow ledger, and check every
    /// invariant. Returns the outputs the engine emitted.
    pub fn apply(&mut self, message: &InputMessage) -> &[OutputMessage] {
        self.engine.process(message, &mut self.outputs);
        self.report.messages += 1;

        self.reconcile(message);
        crate::invariants::check_engine(&self.engine);
        self.check_conservation();

        &self.outputs
    }

    /// Fold the outputs of one message into the shadow ledger.
    fn reconcile(&mut self, input: &InputMessage) {
        if let InputMessage::NewOrder(order) = input {
            let previous = self.shadow.insert(
                order.packed_key(),
                ShadowOrder {
                    symbol: order.symbol,
                    remaining: order.quantity,
                },
            );
            assert!(previous.is_none(), "order identity reused while open");
        }

        let outputs = std::mem::take(&mut self.outputs);
        for msg in &outputs {
            match msg {
                OutputMessage::Ack { .. } => self.report.acks += 1,
                OutputMessage::CancelAck {
                    user_id,
                    user_order_id,
                    symbol,
                } => {
                    self.report.cancel_acks += 1;
                    if symbol.is_unknown() {
                        self.report.unknown_cancels += 1;
                        assert!(
                            !self.shadow.contains_key(&packed_key(*user_id, *user_order_id)),
                            "unknown-cancel ack for an open order"
                        );
                    } else {
                        let removed = self.shadow.remove(&packed_key(*user_id, *user_order_id));
                        assert!(removed.is_some(), "cancel ack for untracked order");
                    }
                }
                OutputMessage::Trade {
                    buy_user_id,
                    buy_user_order_id,
                    sell_user_id,
                    sell_user_order_id,
                    quantity,
                    ..
                } => {
                    self.report.trades += 1;
                    self.report.traded_quantity += *quantity as u64;
                    self.consume(packed_key(*buy_user_id, *buy_user_order_id), *quantity);
                    self.consume(packed_key(*sell_user_id, *sell_user_order_id), *quantity);
                }
                OutputMessage::TopOfBook { .. } => self.report.tob_updates += 1,
            }
        }
        self.outputs = outputs;

        // A market order's residual is discarded silently; drop it from
        // the ledger once its message is fully processed.
        if let InputMessage::NewOrder(order) = input {
            if OrderType::from_price(order.price) == OrderType::Market {
                if let Some(residual) = self.shadow.remove(&order.packed_key()) {
                    self.report.discarded_market_quantity += residual.remaining as u64;
                }
            }
        }
    }

    fn consume(&mut self, key: u64, quantity: u32) {
        let entry = self.shadow.get_mut(&key).expect("trade for untracked order");
        assert!(entry.remaining >= quantity, "trade exceeds open quantity");
        entry.remaining -= quantity;
        if entry.remaining == 0 {
            self.shadow.remove(&key);
        }
    }

    /// Open quantity per symbol in the ledger must equal the quantity
    /// resting in the engine's books.
    fn check_conservation(&self) {
        let mut ledger: HashMap<Symbol, u64> = HashMap::new();
        for order in self.shadow.values() {
            *ledger.entry(order.symbol).or_default() += order.remaining as u64;
        }

        for book in self.engine.books_sorted() {
            let resting: u64 = book
                .bids()
                .iter()
                .chain(book.asks().iter())
                .map(PriceLevel::aggregate_quantity)
                .sum();
            let open = ledger.remove(&book.symbol()).unwrap_or(0);
            assert_eq!(
                open,
                resting,
                "conservation violated for {}",
                book.symbol()
            );
        }

        assert!(ledger.is_empty(), "shadow ledger tracks unregistered books");
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
