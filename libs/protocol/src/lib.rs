//! Wire protocols for the matching engine
//!
//! Two external encodings of the same message set: a human-readable CSV
//! line protocol and a fixed-layout big-endian binary protocol, plus
//! per-connection protocol detection. Decode errors are recoverable; the
//! transport counts and discards the offending frame or line.
//!
//! # Modules
//! - `wire`: magic, type bytes, fixed payload sizes
//! - `csv`: line codec
//! - `binary`: binary codec
//! - `detect`: first-byte protocol detection
//! - `error`: decode error taxonomy

pub mod binary;
pub mod csv;
pub mod detect;
pub mod error;
pub mod wire;

pub use detect::WireProtocol;
pub use error::ProtocolError;
