//! Internal order record
//!
//! The mutable representation of an order inside the book. Orders are pure
//! data with respect to one another: they do not know which book or level
//! owns them. The sequence number is assigned once at admission and never
//! changes; FIFO queue position encodes time priority.

use types::{NewOrder, OrderType, Side};

/// A resting or in-flight order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    user_id: u32,
    user_order_id: u32,
    symbol_packed: u64,
    price: u32,
    quantity: u32,
    remaining_quantity: u32,
    side: Side,
    order_type: OrderType,
    sequence: u64,
}

impl Order {
    /// Create an order from an admitted request.
    ///
    /// The caller assigns `sequence` from the engine's monotonic counter.
    pub fn new(msg: &NewOrder, sequence: u64) -> Self {
        assert!(msg.quantity > 0, "order quantity must be positive");

        Self {
            user_id: msg.user_id,
            user_order_id: msg.user_order_id,
            symbol_packed: msg.symbol.packed(),
            price: msg.price,
            quantity: msg.quantity,
            remaining_quantity: msg.quantity,
            side: msg.side,
            order_type: OrderType::from_price(msg.price),
            sequence,
        }
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn user_order_id(&self) -> u32 {
        self.user_order_id
    }

    pub fn symbol_packed(&self) -> u64 {
        self.symbol_packed
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn remaining_quantity(&self) -> u32 {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> u32 {
        self.quantity - self.remaining_quantity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Map key for the cancel index.
    pub fn packed_key(&self) -> u64 {
        types::packed_key(self.user_id, self.user_order_id)
    }

    /// Fill the order by exactly `qty` units and return the amount filled.
    ///
    /// Requires `0 < qty <= remaining_quantity`.
    pub fn fill(&mut self, qty: u32) -> u32 {
        assert!(qty > 0, "fill with zero quantity");
        assert!(
            qty <= self.remaining_quantity,
            "fill exceeds remaining quantity"
        );

        self.remaining_quantity -= qty;
        qty
    }

    /// Whether this order can trade against a resting order at
    /// `passive_price`. Market orders match anything; limit buys need
    /// `passive_price <= price`, limit sells `passive_price >= price`.
    pub fn can_match(&self, passive_price: u32) -> bool {
        assert!(passive_price > 0, "passive price must be positive");

        if self.is_market() {
            return true;
        }
        match self.side {
            Side::Buy => passive_price <= self.price,
            Side::Sell => passive_price >= self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Symbol;

    fn new_order(price: u32, quantity: u32, side: Side) -> Order {
        Order::new(
            &NewOrder {
                user_id: 1,
                user_order_id: 1,
                symbol: Symbol::new("IBM"),
                price,
                quantity,
                side,
            },
            1,
        )
    }

    #[test]
    fn test_order_type_derived_from_price() {
        assert!(new_order(0, 10, Side::Buy).is_market());
        assert!(new_order(100, 10, Side::Buy).is_limit());
    }

    #[test]
    fn test_fill_decrements_remaining() {
        let mut order = new_order(100, 50, Side::Buy);
        assert_eq!(order.fill(20), 20);
        assert_eq!(order.remaining_quantity(), 30);
        assert_eq!(order.filled_quantity(), 20);
        assert!(!order.is_filled());

        order.fill(30);
        assert!(order.is_filled());
    }

    #[test]
    #[should_panic(expected = "fill exceeds remaining quantity")]
    fn test_overfill_panics() {
        let mut order = new_order(100, 50, Side::Buy);
        order.fill(51);
    }

    #[test]
    #[should_panic(expected = "fill with zero quantity")]
    fn test_zero_fill_panics() {
        let mut order = new_order(100, 50, Side::Buy);
        order.fill(0);
    }

    #[test]
    fn test_can_match_limit_buy() {
        let order = new_order(100, 10, Side::Buy);
        assert!(order.can_match(99));
        assert!(order.can_match(100));
        assert!(!order.can_match(101));
    }

    #[test]
    fn test_can_match_limit_sell() {
        let order = new_order(100, 10, Side::Sell);
        assert!(!order.can_match(99));
        assert!(order.can_match(100));
        assert!(order.can_match(101));
    }

    #[test]
    fn test_can_match_market() {
        assert!(new_order(0, 10, Side::Buy).can_match(1));
        assert!(new_order(0, 10, Side::Sell).can_match(u32::MAX));
    }

    #[test]
    fn test_sequence_fixed_at_admission() {
        let msg = NewOrder {
            user_id: 3,
            user_order_id: 9,
            symbol: Symbol::new("AAPL"),
            price: 50,
            quantity: 5,
            side: Side::Sell,
        };
        let order = Order::new(&msg, 42);
        assert_eq!(order.sequence(), 42);
        assert_eq!(order.packed_key(), msg.packed_key());
    }
}
