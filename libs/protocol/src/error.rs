//! Protocol decode errors
//!
//! A decode error is recovered locally by the transport: the offending
//! frame or line is counted and discarded, and the client is not notified.

use thiserror::Error;

/// Error raised while decoding a wire message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated message: {context}")]
    Truncated { context: &'static str },

    #[error("invalid magic byte: {0:#04x}")]
    InvalidMagic(u8),

    #[error("unknown message type: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("malformed message: {0}")]
    InvalidFormat(&'static str),
}

impl ProtocolError {
    pub(crate) fn truncated(context: &'static str) -> Self {
        ProtocolError::Truncated { context }
    }

    pub(crate) fn invalid_field(field: &'static str, value: impl Into<String>) -> Self {
        ProtocolError::InvalidField {
            field,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProtocolError::InvalidMagic(0x00).to_string(),
            "invalid magic byte: 0x00"
        );
        assert_eq!(
            ProtocolError::invalid_field("side", "Z").to_string(),
            "invalid side field: \"Z\""
        );
    }
}
