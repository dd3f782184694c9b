//! Binary wire constants
//!
//! All multi-byte integers are big-endian. Every binary payload begins
//! with a one-byte magic followed by a one-byte type discriminator;
//! payload sizes are fixed per type.

/// Magic byte for binary payloads, ASCII `M`.
pub const MAGIC: u8 = 0x4D;

/// Fixed symbol field size on the wire (left-aligned, zero-padded).
pub const WIRE_SYMBOL_SIZE: usize = 8;

/// Upper bound on a single inbound frame; anything larger is malformed.
pub const MAX_FRAME_SIZE: usize = 1024;

// Input message types (client → server)
pub const INPUT_NEW_ORDER: u8 = b'N';
pub const INPUT_CANCEL: u8 = b'C';
pub const INPUT_FLUSH: u8 = b'F';
pub const INPUT_QUERY: u8 = b'Q';

// Output message types (server → client)
pub const OUTPUT_ACK: u8 = b'A';
pub const OUTPUT_CANCEL_ACK: u8 = b'X';
pub const OUTPUT_TRADE: u8 = b'T';
pub const OUTPUT_TOP_OF_BOOK: u8 = b'B';

/// NewOrder: magic(1) + type(1) + userId(4) + symbol(8) + price(4) + qty(4) + side(1) + orderId(4)
pub const NEW_ORDER_SIZE: usize = 27;
/// Cancel: magic(1) + type(1) + userId(4) + symbol(8) + orderId(4)
pub const CANCEL_SIZE: usize = 18;
/// Flush: magic(1) + type(1)
pub const FLUSH_SIZE: usize = 2;
/// Query: magic(1) + type(1) + symbol(8)
pub const QUERY_SIZE: usize = 10;

/// Ack / CancelAck: magic(1) + type(1) + symbol(8) + userId(4) + orderId(4)
pub const ACK_SIZE: usize = 18;
pub const CANCEL_ACK_SIZE: usize = 18;
/// Trade: magic(1) + type(1) + symbol(8) + buyUser(4) + buyOrder(4) + sellUser(4) + sellOrder(4) + price(4) + qty(4)
pub const TRADE_SIZE: usize = 34;
/// TopOfBook: magic(1) + type(1) + symbol(8) + side(1) + price(4) + qty(4) + padding(1)
pub const TOP_OF_BOOK_SIZE: usize = 20;

/// Expected payload size for an input type, `None` for unknown types.
pub fn input_message_size(msg_type: u8) -> Option<usize> {
    match msg_type {
        INPUT_NEW_ORDER => Some(NEW_ORDER_SIZE),
        INPUT_CANCEL => Some(CANCEL_SIZE),
        INPUT_FLUSH => Some(FLUSH_SIZE),
        INPUT_QUERY => Some(QUERY_SIZE),
        _ => None,
    }
}

/// Expected payload size for an output type, `None` for unknown types.
pub fn output_message_size(msg_type: u8) -> Option<usize> {
    match msg_type {
        OUTPUT_ACK => Some(ACK_SIZE),
        OUTPUT_CANCEL_ACK => Some(CANCEL_ACK_SIZE),
        OUTPUT_TRADE => Some(TRADE_SIZE),
        OUTPUT_TOP_OF_BOOK => Some(TOP_OF_BOOK_SIZE),
        _ => None,
    }
}
