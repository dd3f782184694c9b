//! CSV line codec
//!
//! Human-readable line protocol. Inputs:
//!
//! ```text
//! N, userId, symbol, price, qty, side(B/S), userOrderId
//! C, userId, userOrderId
//! F
//! Q, symbol
//! ```
//!
//! Outputs:
//!
//! ```text
//! A,userId,userOrderId,symbol
//! X,userId,userOrderId,symbol
//! T,symbol,buyUserId,buyOrderId,sellUserId,sellOrderId,price,qty
//! B,symbol,side,price,qty        (eliminated sides encode price/qty as -,-)
//! ```
//!
//! Fields are trimmed on decode; outputs are encoded without padding.
//! Blank lines and lines starting with `#` are ignored.

use crate::error::ProtocolError;
use types::{Cancel, InputMessage, NewOrder, OutputMessage, Side, Symbol, TopOfBookQuery};

/// Decode a single input line.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn decode_input_line(line: &str) -> Result<Option<InputMessage>, ProtocolError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let tag = fields[0].to_ascii_uppercase();

    match tag.as_str() {
        "N" => decode_new_order(&fields).map(Some),
        "C" => decode_cancel(&fields).map(Some),
        "F" => Ok(Some(InputMessage::Flush)),
        "Q" => decode_query(&fields).map(Some),
        _ => Err(ProtocolError::UnknownMessageType(
            tag.bytes().next().unwrap_or(0),
        )),
    }
}

fn decode_new_order(fields: &[&str]) -> Result<InputMessage, ProtocolError> {
    if fields.len() < 7 {
        return Err(ProtocolError::InvalidFormat(
            "NewOrder requires 7 fields: N, userId, symbol, price, qty, side, orderId",
        ));
    }

    let user_id = parse_u32("userId", fields[1])?;
    let symbol = parse_symbol(fields[2])?;
    let price = parse_u32("price", fields[3])?;
    let quantity = parse_u32("qty", fields[4])?;
    if quantity == 0 {
        return Err(ProtocolError::invalid_field("qty", fields[4]));
    }
    let side = fields[5]
        .bytes()
        .next()
        .and_then(|b| Side::from_wire(b.to_ascii_uppercase()))
        .ok_or_else(|| ProtocolError::invalid_field("side", fields[5]))?;
    let user_order_id = parse_u32("orderId", fields[6])?;

    Ok(InputMessage::NewOrder(NewOrder {
        user_id,
        user_order_id,
        symbol,
        price,
        quantity,
        side,
    }))
}

fn decode_cancel(fields: &[&str]) -> Result<InputMessage, ProtocolError> {
    if fields.len() < 3 {
        return Err(ProtocolError::InvalidFormat(
            "Cancel requires 3 fields: C, userId, orderId",
        ));
    }

    Ok(InputMessage::Cancel(Cancel {
        user_id: parse_u32("userId", fields[1])?,
        user_order_id: parse_u32("orderId", fields[2])?,
    }))
}

fn decode_query(fields: &[&str]) -> Result<InputMessage, ProtocolError> {
    if fields.len() < 2 {
        return Err(ProtocolError::InvalidFormat(
            "Query requires 2 fields: Q, symbol",
        ));
    }

    Ok(InputMessage::TopOfBookQuery(TopOfBookQuery {
        symbol: parse_symbol(fields[1])?,
    }))
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, ProtocolError> {
    value
        .parse::<u32>()
        .map_err(|_| ProtocolError::invalid_field(field, value))
}

// An empty symbol would collide with the unknown sentinel, which is
// reserved for outputs.
fn parse_symbol(value: &str) -> Result<Symbol, ProtocolError> {
    let symbol = Symbol::new(value);
    if symbol.is_unknown() {
        return Err(ProtocolError::invalid_field("symbol", value));
    }
    Ok(symbol)
}

/// Encode an output message as one line, without the trailing newline.
pub fn encode_output_line(msg: &OutputMessage) -> String {
    match msg {
        OutputMessage::Ack {
            user_id,
            user_order_id,
            symbol,
        } => format!("A,{user_id},{user_order_id},{symbol}"),
        OutputMessage::CancelAck {
            user_id,
            user_order_id,
            symbol,
        } => format!("X,{user_id},{user_order_id},{symbol}"),
        OutputMessage::Trade {
            symbol,
            buy_user_id,
            buy_user_order_id,
            sell_user_id,
            sell_user_order_id,
            price,
            quantity,
        } => format!(
            "T,{symbol},{buy_user_id},{buy_user_order_id},{sell_user_id},{sell_user_order_id},{price},{quantity}"
        ),
        OutputMessage::TopOfBook {
            symbol,
            side,
            price,
            quantity,
        } => {
            let side = side.wire() as char;
            if *price == 0 && *quantity == 0 {
                format!("B,{symbol},{side},-,-")
            } else {
                format!("B,{symbol},{side},{price},{quantity}")
            }
        }
    }
}
