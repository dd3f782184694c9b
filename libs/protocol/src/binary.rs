//! Binary codec
//!
//! Fixed-layout big-endian payloads, each starting with the magic byte and
//! a type discriminator. Payload sizes are fixed per type (see
//! [`crate::wire`]); the transport carries payloads inside
//! `[frame_len: u32][payload]` frames.

use crate::error::ProtocolError;
use crate::wire::{self, MAGIC, WIRE_SYMBOL_SIZE};
use types::{Cancel, InputMessage, NewOrder, OutputMessage, Side, Symbol, TopOfBookQuery};

/// Decode one input payload.
pub fn decode_input(buf: &[u8]) -> Result<InputMessage, ProtocolError> {
    if buf.len() < 2 {
        return Err(ProtocolError::truncated("need at least 2 bytes"));
    }
    if buf[0] != MAGIC {
        return Err(ProtocolError::InvalidMagic(buf[0]));
    }

    let msg_type = buf[1];
    let expected = wire::input_message_size(msg_type)
        .ok_or(ProtocolError::UnknownMessageType(msg_type))?;
    if buf.len() < expected {
        return Err(ProtocolError::truncated("short input payload"));
    }

    match msg_type {
        wire::INPUT_NEW_ORDER => decode_new_order(buf),
        wire::INPUT_CANCEL => decode_cancel(buf),
        wire::INPUT_FLUSH => Ok(InputMessage::Flush),
        wire::INPUT_QUERY => decode_query(buf),
        _ => unreachable!("size lookup filtered unknown types"),
    }
}

fn decode_new_order(buf: &[u8]) -> Result<InputMessage, ProtocolError> {
    // magic(1) type(1) userId(4) symbol(8) price(4) qty(4) side(1) orderId(4)
    let user_id = read_u32(buf, 2);
    let symbol = read_input_symbol(buf, 6)?;
    let price = read_u32(buf, 14);
    let quantity = read_u32(buf, 18);
    if quantity == 0 {
        return Err(ProtocolError::invalid_field("qty", "0"));
    }
    let side = Side::from_wire(buf[22])
        .ok_or_else(|| ProtocolError::invalid_field("side", (buf[22] as char).to_string()))?;
    let user_order_id = read_u32(buf, 23);

    Ok(InputMessage::NewOrder(NewOrder {
        user_id,
        user_order_id,
        symbol,
        price,
        quantity,
        side,
    }))
}

fn decode_cancel(buf: &[u8]) -> Result<InputMessage, ProtocolError> {
    // magic(1) type(1) userId(4) symbol(8) orderId(4); the symbol field is
    // carried on the wire but cancels are routed by identity alone.
    let user_id = read_u32(buf, 2);
    let user_order_id = read_u32(buf, 14);

    Ok(InputMessage::Cancel(Cancel {
        user_id,
        user_order_id,
    }))
}

fn decode_query(buf: &[u8]) -> Result<InputMessage, ProtocolError> {
    // magic(1) type(1) symbol(8)
    Ok(InputMessage::TopOfBookQuery(TopOfBookQuery {
        symbol: read_input_symbol(buf, 2)?,
    }))
}

/// Encode one input payload, appending to `out`.
pub fn encode_input(msg: &InputMessage, out: &mut Vec<u8>) {
    match msg {
        InputMessage::NewOrder(order) => {
            out.push(MAGIC);
            out.push(wire::INPUT_NEW_ORDER);
            out.extend_from_slice(&order.user_id.to_be_bytes());
            out.extend_from_slice(&order.symbol.to_wire());
            out.extend_from_slice(&order.price.to_be_bytes());
            out.extend_from_slice(&order.quantity.to_be_bytes());
            out.push(order.side.wire());
            out.extend_from_slice(&order.user_order_id.to_be_bytes());
        }
        InputMessage::Cancel(cancel) => {
            out.push(MAGIC);
            out.push(wire::INPUT_CANCEL);
            out.extend_from_slice(&cancel.user_id.to_be_bytes());
            out.extend_from_slice(&[0u8; WIRE_SYMBOL_SIZE]);
            out.extend_from_slice(&cancel.user_order_id.to_be_bytes());
        }
        InputMessage::Flush => {
            out.push(MAGIC);
            out.push(wire::INPUT_FLUSH);
        }
        InputMessage::TopOfBookQuery(query) => {
            out.push(MAGIC);
            out.push(wire::INPUT_QUERY);
            out.extend_from_slice(&query.symbol.to_wire());
        }
    }
}

/// Encode one output payload, appending to `out`.
pub fn encode_output(msg: &OutputMessage, out: &mut Vec<u8>) {
    match msg {
        OutputMessage::Ack {
            user_id,
            user_order_id,
            symbol,
        } => encode_ack_like(wire::OUTPUT_ACK, *symbol, *user_id, *user_order_id, out),
        OutputMessage::CancelAck {
            user_id,
            user_order_id,
            symbol,
        } => encode_ack_like(
            wire::OUTPUT_CANCEL_ACK,
            *symbol,
            *user_id,
            *user_order_id,
            out,
        ),
        OutputMessage::Trade {
            symbol,
            buy_user_id,
            buy_user_order_id,
            sell_user_id,
            sell_user_order_id,
            price,
            quantity,
        } => {
            out.push(MAGIC);
            out.push(wire::OUTPUT_TRADE);
            out.extend_from_slice(&symbol.to_wire());
            out.extend_from_slice(&buy_user_id.to_be_bytes());
            out.extend_from_slice(&buy_user_order_id.to_be_bytes());
            out.extend_from_slice(&sell_user_id.to_be_bytes());
            out.extend_from_slice(&sell_user_order_id.to_be_bytes());
            out.extend_from_slice(&price.to_be_bytes());
            out.extend_from_slice(&quantity.to_be_bytes());
        }
        OutputMessage::TopOfBook {
            symbol,
            side,
            price,
            quantity,
        } => {
            out.push(MAGIC);
            out.push(wire::OUTPUT_TOP_OF_BOOK);
            out.extend_from_slice(&symbol.to_wire());
            out.push(side.wire());
            out.extend_from_slice(&price.to_be_bytes());
            out.extend_from_slice(&quantity.to_be_bytes());
            out.push(0); // padding
        }
    }
}

/// Decode one output payload. Used by market-data consumers and tests.
pub fn decode_output(buf: &[u8]) -> Result<OutputMessage, ProtocolError> {
    if buf.len() < 2 {
        return Err(ProtocolError::truncated("need at least 2 bytes"));
    }
    if buf[0] != MAGIC {
        return Err(ProtocolError::InvalidMagic(buf[0]));
    }

    let msg_type = buf[1];
    let expected = wire::output_message_size(msg_type)
        .ok_or(ProtocolError::UnknownMessageType(msg_type))?;
    if buf.len() < expected {
        return Err(ProtocolError::truncated("short output payload"));
    }

    match msg_type {
        wire::OUTPUT_ACK | wire::OUTPUT_CANCEL_ACK => {
            let symbol = read_symbol(buf, 2);
            let user_id = read_u32(buf, 10);
            let user_order_id = read_u32(buf, 14);
            Ok(if msg_type == wire::OUTPUT_ACK {
                OutputMessage::ack(user_id, user_order_id, symbol)
            } else {
                OutputMessage::cancel_ack(user_id, user_order_id, symbol)
            })
        }
        wire::OUTPUT_TRADE => Ok(OutputMessage::trade(
            read_symbol(buf, 2),
            read_u32(buf, 10),
            read_u32(buf, 14),
            read_u32(buf, 18),
            read_u32(buf, 22),
            read_u32(buf, 26),
            read_u32(buf, 30),
        )),
        wire::OUTPUT_TOP_OF_BOOK => {
            let symbol = read_symbol(buf, 2);
            let side = Side::from_wire(buf[10])
                .ok_or_else(|| ProtocolError::invalid_field("side", (buf[10] as char).to_string()))?;
            Ok(OutputMessage::top_of_book(
                symbol,
                side,
                read_u32(buf, 11),
                read_u32(buf, 15),
            ))
        }
        _ => unreachable!("size lookup filtered unknown types"),
    }
}

fn encode_ack_like(msg_type: u8, symbol: Symbol, user_id: u32, user_order_id: u32, out: &mut Vec<u8>) {
    out.push(MAGIC);
    out.push(msg_type);
    out.extend_from_slice(&symbol.to_wire());
    out.extend_from_slice(&user_id.to_be_bytes());
    out.extend_from_slice(&user_order_id.to_be_bytes());
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().expect("length checked"))
}

fn read_symbol(buf: &[u8], offset: usize) -> Symbol {
    let bytes: [u8; WIRE_SYMBOL_SIZE] = buf[offset..offset + WIRE_SYMBOL_SIZE]
        .try_into()
        .expect("length checked");
    Symbol::from_wire(bytes)
}

// Inputs never carry the zero symbol; it is reserved for the unknown
// sentinel on outputs.
fn read_input_symbol(buf: &[u8], offset: usize) -> Result<Symbol, ProtocolError> {
    let symbol = read_symbol(buf, offset);
    if symbol.is_unknown() {
        return Err(ProtocolError::invalid_field("symbol", "empty"));
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ACK_SIZE, CANCEL_SIZE, NEW_ORDER_SIZE, QUERY_SIZE, TOP_OF_BOOK_SIZE, TRADE_SIZE};

    fn sample_new_order() -> InputMessage {
        InputMessage::NewOrder(NewOrder {
            user_id: 1,
            user_order_id: 101,
            symbol: Symbol::new("IBM"),
            price: 100,
            quantity: 50,
            side: Side::Buy,
        })
    }

    #[test]
    fn test_new_order_layout() {
        let mut buf = Vec::new();
        encode_input(&sample_new_order(), &mut buf);

        assert_eq!(buf.len(), NEW_ORDER_SIZE);
        assert_eq!(buf[0], MAGIC);
        assert_eq!(buf[1], b'N');
        assert_eq!(&buf[2..6], &1u32.to_be_bytes());
        assert_eq!(&buf[6..9], b"IBM");
        assert_eq!(&buf[14..18], &100u32.to_be_bytes());
        assert_eq!(&buf[18..22], &50u32.to_be_bytes());
        assert_eq!(buf[22], b'B');
        assert_eq!(&buf[23..27], &101u32.to_be_bytes());
    }

    #[test]
    fn test_input_round_trip_byte_for_byte() {
        let messages = [
            sample_new_order(),
            InputMessage::Cancel(Cancel {
                user_id: 7,
                user_order_id: 9,
            }),
            InputMessage::Flush,
            InputMessage::TopOfBookQuery(TopOfBookQuery {
                symbol: Symbol::new("AAPL"),
            }),
        ];

        for msg in messages {
            let mut first = Vec::new();
            encode_input(&msg, &mut first);
            let decoded = decode_input(&first).unwrap();
            assert_eq!(decoded, msg);

            let mut second = Vec::new();
            encode_input(&decoded, &mut second);
            assert_eq!(second, first);
        }
    }

    #[test]
    fn test_cancel_size() {
        let mut buf = Vec::new();
        encode_input(
            &InputMessage::Cancel(Cancel {
                user_id: 1,
                user_order_id: 2,
            }),
            &mut buf,
        );
        assert_eq!(buf.len(), CANCEL_SIZE);

        let mut query = Vec::new();
        encode_input(
            &InputMessage::TopOfBookQuery(TopOfBookQuery {
                symbol: Symbol::new("IBM"),
            }),
            &mut query,
        );
        assert_eq!(query.len(), QUERY_SIZE);
    }

    #[test]
    fn test_output_round_trip_byte_for_byte() {
        let sym = Symbol::new("TSLA");
        let messages = [
            OutputMessage::ack(1, 2, sym),
            OutputMessage::cancel_ack(7, 7, Symbol::UNKNOWN),
            OutputMessage::trade(sym, 1, 1, 2, 1, 100, 50),
            OutputMessage::top_of_book(sym, Side::Sell, 101, 5),
            OutputMessage::top_of_book_eliminated(sym, Side::Buy),
        ];

        for msg in messages {
            let mut first = Vec::new();
            encode_output(&msg, &mut first);
            let decoded = decode_output(&first).unwrap();
            assert_eq!(decoded, msg);

            let mut second = Vec::new();
            encode_output(&decoded, &mut second);
            assert_eq!(second, first);
        }
    }

    #[test]
    fn test_output_sizes_match_wire_constants() {
        let sym = Symbol::new("IBM");
        let mut buf = Vec::new();
        encode_output(&OutputMessage::ack(1, 1, sym), &mut buf);
        assert_eq!(buf.len(), ACK_SIZE);

        buf.clear();
        encode_output(&OutputMessage::trade(sym, 1, 1, 2, 1, 100, 50), &mut buf);
        assert_eq!(buf.len(), TRADE_SIZE);

        buf.clear();
        encode_output(&OutputMessage::top_of_book(sym, Side::Buy, 100, 50), &mut buf);
        assert_eq!(buf.len(), TOP_OF_BOOK_SIZE);
        assert_eq!(*buf.last().unwrap(), 0);
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(
            decode_input(&[MAGIC]),
            Err(ProtocolError::Truncated { .. })
        ));
        assert!(matches!(
            decode_input(&[0x00, b'N']),
            Err(ProtocolError::InvalidMagic(0x00))
        ));
        assert!(matches!(
            decode_input(&[MAGIC, b'Z']),
            Err(ProtocolError::UnknownMessageType(b'Z'))
        ));

        // NewOrder with truncated body
        let mut buf = Vec::new();
        encode_input(&sample_new_order(), &mut buf);
        assert!(matches!(
            decode_input(&buf[..buf.len() - 1]),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_symbol() {
        let mut buf = Vec::new();
        encode_input(&sample_new_order(), &mut buf);
        buf[6..14].copy_from_slice(&[0u8; 8]);
        assert!(matches!(
            decode_input(&buf),
            Err(ProtocolError::InvalidField { field: "symbol", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_zero_quantity() {
        let mut buf = Vec::new();
        encode_input(&sample_new_order(), &mut buf);
        buf[18..22].copy_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            decode_input(&buf),
            Err(ProtocolError::InvalidField { field: "qty", .. })
        ));
    }
}
