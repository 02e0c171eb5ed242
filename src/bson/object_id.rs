//! ObjectId: the 12-byte document identifier and its 24-character hex form.

use crate::error::{BsonError, Result};
use std::fmt;
use std::str::FromStr;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// A 12-byte document identifier.
///
/// The canonical text form is exactly 24 lowercase hex characters; parsing accepts
/// either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Raw byte length on the wire
    pub const LEN: usize = 12;

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Build from a raw slice, which must be exactly 12 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 12] = bytes.try_into().map_err(|_| {
            BsonError::InvalidObjectId(format!("expected 12 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(raw))
    }

    /// Parse the 24-character hex form
    pub fn parse_hex(text: &str) -> Result<Self> {
        let text = text.as_bytes();
        if text.len() != Self::LEN * 2 {
            return Err(BsonError::InvalidObjectId(format!(
                "expected 24 hex characters, got {}",
                text.len()
            )));
        }

        let mut raw = [0u8; 12];
        for (byte, pair) in raw.iter_mut().zip(text.chunks_exact(2)) {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => *byte = (hi << 4) | lo,
                _ => {
                    return Err(BsonError::InvalidObjectId(format!(
                        "invalid hex text: {}",
                        String::from_utf8_lossy(text)
                    )))
                }
            }
        }
        Ok(Self(raw))
    }

    pub fn bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// 24 lowercase hex characters
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(Self::LEN * 2);
        for byte in self.0 {
            out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            out.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
        }
        out
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl FromStr for ObjectId {
    type Err = BsonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
