//! Single-symbol order book with price-time priority matching
//!
//! Price levels are kept in sorted `Vec`s for cache-friendly iteration:
//! bids descending (best bid at index 0), asks ascending (best ask at
//! index 0). All outputs for one request are appended to a caller-owned
//! buffer in a fixed order: ack, trades in execution order, then at most
//! one top-of-book update per changed side.

use crate::book::price_level::{PriceLevel, MAX_ORDERS_PER_LEVEL};
use crate::order::Order;
use std::collections::HashMap;
use types::{OutputMessage, Side, Symbol, TopOfBookSnapshot};

/// Maximum price levels per side.
pub const MAX_PRICE_LEVELS: usize = 10_000;

/// Maximum passive levels visited while matching one incoming order.
pub const MAX_MATCH_ITERATIONS: usize = 100_000;

/// Stable cursor to a resting order, kept in the engine's cancel index.
///
/// The index never aliases the order itself; a cancel re-locates the order
/// through its book by side, price level, and identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLocation {
    pub symbol: Symbol,
    pub side: Side,
    pub price: u32,
}

/// One symbol's order book.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: Symbol,
    /// Bid levels, strictly descending by price.
    bids: Vec<PriceLevel>,
    /// Ask levels, strictly ascending by price.
    asks: Vec<PriceLevel>,
    /// Last reported top of book, for change detection.
    prev_top: TopOfBookSnapshot,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: Vec::new(),
            asks: Vec::new(),
            prev_top: TopOfBookSnapshot::EMPTY,
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Last top-of-book reported downstream.
    pub fn prev_top(&self) -> TopOfBookSnapshot {
        self.prev_top
    }

    /// Current best bid / best offer, zeros for an empty side.
    pub fn top_of_book(&self) -> TopOfBookSnapshot {
        TopOfBookSnapshot {
            bid_price: self.bids.first().map_or(0, PriceLevel::price),
            bid_quantity: self.bids.first().map_or(0, PriceLevel::aggregate_quantity),
            ask_price: self.asks.first().map_or(0, PriceLevel::price),
            ask_quantity: self.asks.first().map_or(0, PriceLevel::aggregate_quantity),
        }
    }

    /// Process an admitted order: ack, match aggressively, rest any limit
    /// remainder, then report top-of-book changes.
    ///
    /// Resting orders are recorded in `index`; passive orders consumed by
    /// matching are removed from it in the same step.
    pub fn add_order(
        &mut self,
        mut order: Order,
        index: &mut HashMap<u64, OrderLocation>,
        outputs: &mut Vec<OutputMessage>,
    ) {
        assert!(
            order.symbol_packed() == self.symbol.packed(),
            "order symbol mismatch"
        );
        assert!(order.remaining_quantity() > 0, "admitting a filled order");

        outputs.push(OutputMessage::ack(
            order.user_id(),
            order.user_order_id(),
            self.symbol,
        ));

        let aggressor_side = order.side();
        self.match_order(&mut order, index, outputs);

        // Limit remainder rests; market remainder is discarded silently.
        if order.remaining_quantity() > 0 && order.is_limit() {
            let key = order.packed_key();
            let location = OrderLocation {
                symbol: self.symbol,
                side: aggressor_side,
                price: order.price(),
            };
            self.insert_resting(order);
            index.insert(key, location);
        }

        // Executions consume the opposing side, so report it first.
        self.emit_tob_changes(aggressor_side.opposite(), outputs);
    }

    /// Remove a resting order previously located through the cancel index.
    ///
    /// The index guarantees the order is present; a miss here is a broken
    /// invariant.
    pub fn cancel_resting(
        &mut self,
        user_id: u32,
        user_order_id: u32,
        side: Side,
        price: u32,
        outputs: &mut Vec<OutputMessage>,
    ) {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let pos = Self::find_level(levels, side, price)
            .expect("indexed order has no price level");
        let level = &mut levels[pos];
        let removed = level.remove_by_identity(user_id, user_order_id);
        assert!(removed.is_some(), "indexed order missing from its level");

        if level.is_empty() {
            levels.remove(pos);
        }

        outputs.push(OutputMessage::cancel_ack(user_id, user_order_id, self.symbol));
        self.emit_tob_changes(Side::Buy, outputs);
    }

    /// Clear both sides, acknowledging every resting order individually
    /// (bids first, best level outward, FIFO within a level) and then
    /// reporting one elimination per previously populated side.
    pub fn flush(&mut self, outputs: &mut Vec<OutputMessage>) {
        let had_bids = !self.bids.is_empty();
        let had_asks = !self.asks.is_empty();

        for level in self.bids.iter().chain(self.asks.iter()) {
            for order in level.iter() {
                outputs.push(OutputMessage::cancel_ack(
                    order.user_id(),
                    order.user_order_id(),
                    self.symbol,
                ));
            }
        }

        if had_bids {
            outputs.push(OutputMessage::top_of_book_eliminated(self.symbol, Side::Buy));
        }
        if had_asks {
            outputs.push(OutputMessage::top_of_book_eliminated(self.symbol, Side::Sell));
        }

        self.bids.clear();
        self.asks.clear();
        self.prev_top = TopOfBookSnapshot::EMPTY;
    }

    /// Walk the opposing side from the best price outward, trading FIFO
    /// within each level, until the order is filled or no longer crosses.
    fn match_order(
        &mut self,
        order: &mut Order,
        index: &mut HashMap<u64, OrderLocation>,
        outputs: &mut Vec<OutputMessage>,
    ) {
        let symbol = self.symbol;
        let opposing = match order.side() {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        };

        let mut iterations = 0usize;
        while order.remaining_quantity() > 0 && !opposing.is_empty() {
            iterations += 1;
            assert!(iterations <= MAX_MATCH_ITERATIONS, "matching loop exceeded bound");

            let level = &mut opposing[0];
            // Levels are sorted best-first, so the first non-crossing
            // price ends the walk.
            if !order.can_match(level.price()) {
                break;
            }

            Self::match_at_level(symbol, order, level, index, outputs);

            if level.is_empty() {
                opposing.remove(0);
            }
        }
    }

    /// Trade against one level in FIFO order. Trades execute at the
    /// resting order's price, giving any improvement to the aggressor.
    fn match_at_level(
        symbol: Symbol,
        order: &mut Order,
        level: &mut PriceLevel,
        index: &mut HashMap<u64, OrderLocation>,
        outputs: &mut Vec<OutputMessage>,
    ) {
        let trade_price = level.price();
        let mut fills = 0usize;

        while order.remaining_quantity() > 0 {
            let Some(passive) = level.front_mut() else {
                break;
            };
            fills += 1;
            assert!(fills <= MAX_ORDERS_PER_LEVEL, "level fill loop exceeded bound");

            let qty = order.remaining_quantity().min(passive.remaining_quantity());
            assert!(qty > 0, "zero-quantity trade");

            let passive_user = passive.user_id();
            let passive_order_id = passive.user_order_id();

            // Buyer fields always come from the buy-side order.
            outputs.push(if order.is_buy() {
                OutputMessage::trade(
                    symbol,
                    order.user_id(),
                    order.user_order_id(),
                    passive_user,
                    passive_order_id,
                    trade_price,
                    qty,
                )
            } else {
                OutputMessage::trade(
                    symbol,
                    passive_user,
                    passive_order_id,
                    order.user_id(),
                    order.user_order_id(),
                    trade_price,
                    qty,
                )
            });

            order.fill(qty);
            passive.fill(qty);
            let passive_filled = passive.is_filled();
            level.on_fill(qty);

            if passive_filled {
                level.pop_filled_prefix(|removed| {
                    index.remove(&removed.packed_key());
                });
            } else {
                // Passive absorbed the whole remainder.
                break;
            }
        }
    }

    /// Insert a limit remainder into its side's sorted level list.
    fn insert_resting(&mut self, order: Order) {
        assert!(order.is_limit(), "market orders never rest");
        assert!(order.remaining_quantity() > 0, "resting a filled order");

        let side = order.side();
        let price = order.price();
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        match Self::find_level(levels, side, price) {
            Ok(pos) => levels[pos].append(order),
            Err(pos) => {
                assert!(levels.len() < MAX_PRICE_LEVELS, "price level limit exceeded");
                let mut level = PriceLevel::new(price);
                level.append(order);
                levels.insert(pos, level);
            }
        }
    }

    /// Binary search for `price` in a side's sorted level list. Bids are
    /// descending, asks ascending.
    fn find_level(levels: &[PriceLevel], side: Side, price: u32) -> Result<usize, usize> {
        match side {
            Side::Buy => levels.binary_search_by(|level| price.cmp(&level.price())),
            Side::Sell => levels.binary_search_by(|level| level.price().cmp(&price)),
        }
    }

    /// Compare the current top of book against the last reported one and
    /// emit one update per changed side, `first` side first.
    fn emit_tob_changes(&mut self, first: Side, outputs: &mut Vec<OutputMessage>) {
        let current = self.top_of_book();
        let prev = self.prev_top;

        match first {
            Side::Buy => {
                self.emit_side_change(Side::Buy, &current, &prev, outputs);
                self.emit_side_change(Side::Sell, &current, &prev, outputs);
            }
            Side::Sell => {
                self.emit_side_change(Side::Sell, &current, &prev, outputs);
                self.emit_side_change(Side::Buy, &current, &prev, outputs);
            }
        }

        self.prev_top = current;
    }

    fn emit_side_change(
        &self,
        side: Side,
        current: &TopOfBookSnapshot,
        prev: &TopOfBookSnapshot,
        outputs: &mut Vec<OutputMessage>,
    ) {
        let (changed, price, quantity) = match side {
            Side::Buy => (
                current.bid_changed(prev),
                current.bid_price,
                current.bid_quantity,
            ),
            Side::Sell => (
                current.ask_changed(prev),
                current.ask_price,
                current.ask_quantity,
            ),
        };
        if !changed {
            return;
        }

        outputs.push(if price == 0 {
            OutputMessage::top_of_book_eliminated(self.symbol, side)
        } else {
            // The wire quantity field is 32 bits; saturate rather than wrap.
            OutputMessage::top_of_book(self.symbol, side, price, quantity.min(u32::MAX as u64) as u32)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::NewOrder;

    fn sym() -> Symbol {
        Symbol::new("IBM")
    }

    struct Fixture {
        book: OrderBook,
        index: HashMap<u64, OrderLocation>,
        outputs: Vec<OutputMessage>,
        sequence: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                book: OrderBook::new(sym()),
                index: HashMap::new(),
                outputs: Vec::new(),
                sequence: 0,
            }
        }

        fn submit(&mut self, user_id: u32, user_order_id: u32, price: u32, quantity: u32, side: Side) {
            self.sequence += 1;
            let order = Order::new(
                &NewOrder {
                    user_id,
                    user_order_id,
                    symbol: sym(),
                    price,
                    quantity,
                    side,
                },
                self.sequence,
            );
            self.outputs.clear();
            self.book.add_order(order, &mut self.index, &mut self.outputs);
        }
    }

    #[test]
    fn test_resting_order_emits_ack_and_tob() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 50, Side::Buy);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(1, 1, sym()),
                OutputMessage::top_of_book(sym(), Side::Buy, 100, 50),
            ]
        );
        assert!(fx.index.contains_key(&types::packed_key(1, 1)));
    }

    #[test]
    fn test_full_match_consumes_resting_order() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 50, Side::Buy);
        fx.submit(2, 1, 100, 50, Side::Sell);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(2, 1, sym()),
                OutputMessage::trade(sym(), 1, 1, 2, 1, 100, 50),
                OutputMessage::top_of_book_eliminated(sym(), Side::Buy),
            ]
        );
        // Both sides gone from the index: passive fully filled, aggressor
        // never rested.
        assert!(fx.index.is_empty());
        assert!(fx.book.bids().is_empty());
        assert!(fx.book.asks().is_empty());
    }

    #[test]
    fn test_partial_fill_rests_aggressor_remainder() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 40, Side::Sell);
        fx.submit(2, 1, 100, 100, Side::Buy);

        // Opposing (ask) elimination reported before the new bid level.
        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(2, 1, sym()),
                OutputMessage::trade(sym(), 2, 1, 1, 1, 100, 40),
                OutputMessage::top_of_book_eliminated(sym(), Side::Sell),
                OutputMessage::top_of_book(sym(), Side::Buy, 100, 60),
            ]
        );
        assert!(!fx.index.contains_key(&types::packed_key(1, 1)));
        assert!(fx.index.contains_key(&types::packed_key(2, 1)));
    }

    #[test]
    fn test_fifo_within_level() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 10, Side::Buy);
        fx.submit(2, 1, 100, 20, Side::Buy);
        fx.submit(3, 1, 100, 25, Side::Sell);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(3, 1, sym()),
                OutputMessage::trade(sym(), 1, 1, 3, 1, 100, 10),
                OutputMessage::trade(sym(), 2, 1, 3, 1, 100, 15),
                OutputMessage::top_of_book(sym(), Side::Buy, 100, 5),
            ]
        );
    }

    #[test]
    fn test_price_improvement_goes_to_aggressor() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 99, 10, Side::Sell);
        fx.submit(2, 1, 101, 10, Side::Sell);
        fx.submit(3, 1, 101, 15, Side::Buy);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(3, 1, sym()),
                OutputMessage::trade(sym(), 3, 1, 1, 1, 99, 10),
                OutputMessage::trade(sym(), 3, 1, 2, 1, 101, 5),
                OutputMessage::top_of_book(sym(), Side::Sell, 101, 5),
            ]
        );
    }

    #[test]
    fn test_market_order_sweeps_and_discards_residual() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 30, Side::Sell);
        fx.submit(2, 1, 0, 50, Side::Buy);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(2, 1, sym()),
                OutputMessage::trade(sym(), 2, 1, 1, 1, 100, 30),
                OutputMessage::top_of_book_eliminated(sym(), Side::Sell),
            ]
        );
        // Residual 20 discarded, nothing rests.
        assert!(fx.book.bids().is_empty());
        assert!(!fx.index.contains_key(&types::packed_key(2, 1)));
    }

    #[test]
    fn test_market_order_empty_book_acks_only() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 0, 50, Side::Buy);

        assert_eq!(fx.outputs, vec![OutputMessage::ack(1, 1, sym())]);
    }

    #[test]
    fn test_self_trade_permitted() {
        let mut fx = Fixture::new();
        fx.submit(5, 1, 100, 10, Side::Buy);
        fx.submit(5, 2, 100, 10, Side::Sell);

        assert!(fx
            .outputs
            .contains(&OutputMessage::trade(sym(), 5, 1, 5, 2, 100, 10)));
    }

    #[test]
    fn test_no_trade_when_prices_do_not_cross() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 101, 10, Side::Sell);
        fx.submit(2, 1, 100, 10, Side::Buy);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::ack(2, 1, sym()),
                OutputMessage::top_of_book(sym(), Side::Buy, 100, 10),
            ]
        );
        assert_eq!(fx.book.bids().len(), 1);
        assert_eq!(fx.book.asks().len(), 1);
    }

    #[test]
    fn test_sort_invariants_across_inserts() {
        let mut fx = Fixture::new();
        for (i, price) in [103, 101, 105, 102, 104].iter().enumerate() {
            fx.submit(1, i as u32 + 1, *price, 10, Side::Buy);
        }
        for (i, price) in [208, 206, 210, 207, 209].iter().enumerate() {
            fx.submit(2, i as u32 + 1, *price, 10, Side::Sell);
        }

        let bid_prices: Vec<u32> = fx.book.bids().iter().map(PriceLevel::price).collect();
        assert_eq!(bid_prices, vec![105, 104, 103, 102, 101]);
        let ask_prices: Vec<u32> = fx.book.asks().iter().map(PriceLevel::price).collect();
        assert_eq!(ask_prices, vec![206, 207, 208, 209, 210]);
    }

    #[test]
    fn test_cancel_resting_removes_level() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 50, Side::Buy);

        fx.outputs.clear();
        fx.book
            .cancel_resting(1, 1, Side::Buy, 100, &mut fx.outputs);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::cancel_ack(1, 1, sym()),
                OutputMessage::top_of_book_eliminated(sym(), Side::Buy),
            ]
        );
        assert!(fx.book.bids().is_empty());
    }

    #[test]
    fn test_cancel_behind_top_emits_quantity_change() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 50, Side::Buy);
        fx.submit(1, 2, 100, 30, Side::Buy);

        fx.outputs.clear();
        fx.book
            .cancel_resting(1, 2, Side::Buy, 100, &mut fx.outputs);

        assert_eq!(
            fx.outputs,
            vec![
                OutputMessage::cancel_ack(1, 2, sym()),
                OutputMessage::top_of_book(sym(), Side::Buy, 100, 50),
            ]
        );
    }

    #[test]
    fn test_flush_acks_every_resting_order() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 10, Side::Buy);
        fx.submit(1, 2, 101, 10, Side::Buy);
        fx.submit(2, 1, 105, 10, Side::Sell);

        fx.outputs.clear();
        fx.book.flush(&mut fx.outputs);

        assert_eq!(
            fx.outputs,
            vec![
                // Bids best level outward, then asks.
                OutputMessage::cancel_ack(1, 2, sym()),
                OutputMessage::cancel_ack(1, 1, sym()),
                OutputMessage::cancel_ack(2, 1, sym()),
                OutputMessage::top_of_book_eliminated(sym(), Side::Buy),
                OutputMessage::top_of_book_eliminated(sym(), Side::Sell),
            ]
        );
        assert!(fx.book.bids().is_empty());
        assert!(fx.book.asks().is_empty());
        assert_eq!(fx.book.prev_top(), TopOfBookSnapshot::EMPTY);
    }

    #[test]
    fn test_flush_empty_book_emits_nothing() {
        let mut fx = Fixture::new();
        fx.book.flush(&mut fx.outputs);
        assert!(fx.outputs.is_empty());
    }

    #[test]
    fn test_prev_top_tracks_reported_state() {
        let mut fx = Fixture::new();
        fx.submit(1, 1, 100, 50, Side::Buy);
        assert_eq!(fx.book.prev_top(), fx.book.top_of_book());

        fx.submit(2, 1, 101, 25, Side::Sell);
        assert_eq!(fx.book.prev_top(), fx.book.top_of_book());
    }
}
