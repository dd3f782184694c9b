//! Matching engine core
//!
//! Registry of per-symbol order books plus the cancel-routing index.
//! Strictly single-threaded: `process` is a straight-line computation
//! that writes every output for one input into a caller-owned buffer
//! before returning. The monotonic sequence counter lives here, not in
//! process-level state.

use std::collections::HashMap;
use tracing::debug;
use types::{
    Cancel, EngineError, InputMessage, NewOrder, OutputMessage, Side, Symbol, TopOfBookQuery,
};

use crate::book::{OrderBook, OrderLocation};
use crate::order::Order;

/// Maximum number of registered symbols.
pub const MAX_SYMBOLS: usize = 1_024;

/// Multi-symbol matching engine.
pub struct MatchingEngine {
    /// Order books keyed by symbol.
    books: HashMap<Symbol, OrderBook>,
    /// `(user_id, user_order_id)` → location of the resting order. An
    /// entry exists iff the order is resting in exactly one price level
    /// of exactly one book.
    index: HashMap<u64, OrderLocation>,
    /// Monotonic admission counter used for time priority.
    sequence_counter: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            books: HashMap::with_capacity(64),
            index: HashMap::with_capacity(1_024),
            sequence_counter: 0,
        }
    }

    /// Pre-register a symbol, creating an empty book if absent.
    /// Idempotent.
    pub fn register_symbol(&mut self, symbol: &str) -> Result<(), EngineError> {
        let sym = Symbol::new(symbol);
        if sym.is_unknown() {
            return Err(EngineError::InvalidSymbol {
                symbol: symbol.to_string(),
            });
        }
        if self.books.contains_key(&sym) {
            return Ok(());
        }
        if self.books.len() >= MAX_SYMBOLS {
            return Err(EngineError::TooManySymbols { max: MAX_SYMBOLS });
        }

        debug!(symbol = %sym, "registering order book");
        self.books.insert(sym, OrderBook::new(sym));
        Ok(())
    }

    /// Number of registered books.
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Number of resting orders tracked for cancel routing.
    pub fn open_order_count(&self) -> usize {
        self.index.len()
    }

    /// Read access to one symbol's book.
    pub fn book(&self, symbol: Symbol) -> Option<&OrderBook> {
        self.books.get(&symbol)
    }

    /// Iterate books in deterministic (packed symbol) order.
    pub fn books_sorted(&self) -> impl Iterator<Item = &OrderBook> {
        let mut symbols: Vec<Symbol> = self.books.keys().copied().collect();
        symbols.sort();
        symbols.into_iter().map(|s| &self.books[&s])
    }

    /// Process one input message, writing all of its outputs to `outputs`
    /// in the deterministic order: (cancel-)ack, trades, top-of-book
    /// updates. The buffer is cleared on entry and is the only allocation
    /// the hot path touches.
    pub fn process(&mut self, message: &InputMessage, outputs: &mut Vec<OutputMessage>) {
        outputs.clear();
        match message {
            InputMessage::NewOrder(msg) => self.process_new_order(msg, outputs),
            InputMessage::Cancel(msg) => self.process_cancel(msg, outputs),
            InputMessage::Flush => self.process_flush(outputs),
            InputMessage::TopOfBookQuery(query) => self.process_query(query, outputs),
        }
    }

    fn process_new_order(&mut self, msg: &NewOrder, outputs: &mut Vec<OutputMessage>) {
        if !self.books.contains_key(&msg.symbol) {
            assert!(self.books.len() < MAX_SYMBOLS, "symbol limit exceeded");
            debug!(symbol = %msg.symbol, "creating order book on first use");
            self.books.insert(msg.symbol, OrderBook::new(msg.symbol));
        }

        self.sequence_counter += 1;
        let order = Order::new(msg, self.sequence_counter);

        let book = self.books.get_mut(&msg.symbol).expect("book just resolved");
        book.add_order(order, &mut self.index, outputs);
    }

    fn process_cancel(&mut self, msg: &Cancel, outputs: &mut Vec<OutputMessage>) {
        let Some(location) = self.index.remove(&msg.packed_key()) else {
            // Unknown order: still acknowledged, with the sentinel symbol.
            outputs.push(OutputMessage::cancel_ack(
                msg.user_id,
                msg.user_order_id,
                Symbol::UNKNOWN,
            ));
            return;
        };

        let book = self
            .books
            .get_mut(&location.symbol)
            .expect("indexed order has no book");
        book.cancel_resting(
            msg.user_id,
            msg.user_order_id,
            location.side,
            location.price,
            outputs,
        );
    }

    fn process_flush(&mut self, outputs: &mut Vec<OutputMessage>) {
        debug!(books = self.books.len(), open_orders = self.index.len(), "flushing all books");

        // Deterministic book order regardless of hash-map layout.
        let mut symbols: Vec<Symbol> = self.books.keys().copied().collect();
        symbols.sort();
        for symbol in symbols {
            self.books
                .get_mut(&symbol)
                .expect("symbol collected from map")
                .flush(outputs);
        }
        self.index.clear();
    }

    fn process_query(&self, query: &TopOfBookQuery, outputs: &mut Vec<OutputMessage>) {
        // No state change; an unknown symbol emits nothing.
        let Some(book) = self.books.get(&query.symbol) else {
            return;
        };
        let top = book.top_of_book();
        if top.has_bid() {
            outputs.push(OutputMessage::top_of_book(
                query.symbol,
                Side::Buy,
                top.bid_price,
                top.bid_quantity.min(u32::MAX as u64) as u32,
            ));
        }
        if top.has_ask() {
            outputs.push(OutputMessage::top_of_book(
                query.symbol,
                Side::Sell,
                top.ask_price,
                top.ask_quantity.min(u32::MAX as u64) as u32,
            ));
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
