//! Structural invariant checks
//!
//! Verifies after every processed message that each book still holds the
//! properties matching depends on: strict price ordering, no crossed
//! book, aggregate counters equal to the sum of order remainders, FIFO
//! sequence order within levels, and a top-of-book cache that matches
//! the observable book state.

use matching_engine::{MatchingEngine, OrderBook, PriceLevel};

/// Panic if any book in the engine violates a structural invariant.
pub fn check_engine(engine: &MatchingEngine) {
    let mut resting_orders = 0usize;
    for book in engine.books_sorted() {
        check_book(book);
        resting_orders += book
            .bids()
            .iter()
            .chain(book.asks().iter())
            .map(PriceLevel::order_count)
            .sum::<usize>();
    }

    // Index coherence: one entry per resting order, nothing stale.
    assert_eq!(
        engine.open_order_count(),
        resting_orders,
        "cancel index out of sync with resting orders"
    );
}

/// Panic if one book violates a structural invariant.
pub fn check_book(book: &OrderBook) {
    check_side(book.bids(), true);
    check_side(book.asks(), false);

    // No-cross: a quiescent book never has bid >= ask.
    let top = book.top_of_book();
    if top.has_bid() && top.has_ask() {
        assert!(
            top.bid_price < top.ask_price,
            "crossed book: bid {} >= ask {}",
            top.bid_price,
            top.ask_price
        );
    }

    // The change-detection cache always matches the observable state
    // once a request has completed.
    assert_eq!(book.prev_top(), top, "stale top-of-book cache");
}

fn check_side(levels: &[PriceLevel], descending: bool) {
    for pair in levels.windows(2) {
        if descending {
            assert!(
                pair[0].price() > pair[1].price(),
                "bid levels not strictly descending"
            );
        } else {
            assert!(
                pair[0].price() < pair[1].price(),
                "ask levels not strictly ascending"
            );
        }
    }

    for level in levels {
        assert!(!level.is_empty(), "empty price level retained");

        let sum: u64 = level.iter().map(|o| o.remaining_quantity() as u64).sum();
        assert_eq!(
            level.aggregate_quantity(),
            sum,
            "level aggregate diverged from order remainders"
        );

        let mut last_sequence = 0u64;
        for order in level.iter() {
            assert!(order.remaining_quantity() > 0, "filled order resting");
            assert!(
                order.sequence() > last_sequence,
                "FIFO order violates sequence monotonicity"
            );
            last_sequence = order.sequence();
        }
    }
}
