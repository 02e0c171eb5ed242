//! # Error Types
//!
//! Error handling for the BSON codec and the OP_MSG framer.
//!
//! Every failure aborts the whole encode, decode or frame operation; there is no
//! partial output. The variants fall into three groups:
//!
//! ## Error Categories
//! - **Encode Errors**: nesting too deep, unencodable keys or values, malformed
//!   ObjectId text, malformed ordered-field lists
//! - **Decode Errors**: truncated input, unterminated C strings, unknown type tags,
//!   OP_MSG header violations (opcode, flags, payload section)
//! - **Frame Errors**: a declared frame length above the protocol cap
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use bson_wire::bson::decode;
//! use bson_wire::error::BsonError;
//!
//! // Declares 16 bytes but carries only 5
//! let bytes = [16u8, 0, 0, 0, 0];
//! match decode(&bytes) {
//!     Err(BsonError::Truncated(_)) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Reader ran out of bytes while decoding a fixed-width value
    pub const ERR_SHORT_VALUE: &str = "decode can't unpack one value";
    /// Declared document length exceeds the bytes available
    pub const ERR_SHORT_DOCUMENT: &str = "declared document length exceeds available bytes";
    /// Declared string or binary length exceeds the bytes available
    pub const ERR_SHORT_BYTES: &str = "declared byte length exceeds available bytes";
    /// Terminator found before the declared end, or missing at it
    pub const ERR_LENGTH_MISMATCH: &str = "declared document length does not match its contents";
    /// String length prefix of zero (a string always carries its NUL)
    pub const ERR_EMPTY_STRING: &str = "string length prefix must be at least 1";
    /// Frame shorter than the OP_MSG header plus an empty body
    pub const ERR_SHORT_FRAME: &str = "frame shorter than OP_MSG header and body";
    /// Embedded body claims more bytes than the frame holds
    pub const ERR_BODY_OVERRUN: &str = "OP_MSG body overruns its frame";

    /// Ordered field list errors
    pub const ERR_ODD_PAIRS: &str = "ordered field list must hold key/value pairs";
    pub const ERR_EMPTY_PAIRS: &str = "ordered field list is empty";
    pub const ERR_ORDER_NOT_ARRAY: &str = "ordered field list must be an array";
}

/// BsonError is the error type for all codec and framing operations
#[derive(Error, Debug)]
pub enum BsonError {
    #[error("Too deep: {depth} nesting levels (maximum: {max})")]
    TooDeep { depth: usize, max: usize },

    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),

    #[error("Invalid value type: {0}")]
    InvalidValueType(String),

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("Invalid ordered dict: {0}")]
    InvalidOrderedDict(String),

    #[error("Truncated input: {0}")]
    Truncated(&'static str),

    #[error("Invalid bson block: cstring")]
    InvalidCString,

    #[error("Invalid bson type: {0}")]
    InvalidType(u8),

    #[error("Unsupported opcode: {0}")]
    InvalidOpcode(u32),

    #[error("Unsupported flags: {0:#x}")]
    InvalidFlags(u32),

    #[error("Unsupported payload section type: {0}")]
    UnsupportedPayloadSection(u8),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BsonError {
    /// True for errors raised while turning values into bytes
    pub fn is_encode_error(&self) -> bool {
        matches!(
            self,
            BsonError::TooDeep { .. }
                | BsonError::InvalidKeyType(_)
                | BsonError::InvalidValueType(_)
                | BsonError::InvalidObjectId(_)
                | BsonError::InvalidOrderedDict(_)
        )
    }
}

/// Type alias for Results using BsonError
pub type Result<T> = std::result::Result<T, BsonError>;
