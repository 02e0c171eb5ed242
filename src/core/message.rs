//! # OP_MSG Frames
//!
//! A single-section OP_MSG: the standard header, flag bits, a payload section
//! byte of 0 and one BSON document body.
//!
//! ## Wire Format
//! ```text
//! [Length(4)] [RequestId(4)] [ResponseTo(4)] [OpCode(4)=2013] [Flags(4)] [Section(1)=0] [Body(BSON)]
//! ```
//! All integers are little-endian.
//!
//! ## Validation
//! - Opcode must be 2013
//! - Flags may only carry the more-to-come bit; checksums are unsupported
//! - Only the single-document body section (type 0) is accepted

use crate::bson::buffer::{Reader, Writer};
use crate::bson::decoder::Decoder;
use crate::bson::encoder::encode_into;
use crate::bson::value::Document;
use crate::config::{
    CodecConfig, OP_CHECKSUM, OP_MORE_TO_COME, OP_MSG_CODE, PAYLOAD_SECTION_BODY,
};
use crate::core::frame::MIN_FRAME_SIZE;
use crate::error::{constants, BsonError, Result};
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// Standard message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub message_length: u32,
    pub request_id: u32,
    pub response_to: u32,
    pub op_code: u32,
}

/// One OP_MSG carrying a single BSON document
#[derive(Debug, Clone, PartialEq)]
pub struct OpMsg {
    pub request_id: u32,
    pub response_to: u32,
    pub flags: u32,
    pub body: Document,
}

impl OpMsg {
    /// Outbound request: response-to and flags are zero
    pub fn new(request_id: u32, body: Document) -> Self {
        Self {
            request_id,
            response_to: 0,
            flags: 0,
            body,
        }
    }

    /// Correlation id of a reply: the request id it answers
    pub fn session_id(&self) -> u32 {
        self.response_to
    }

    pub fn more_to_come(&self) -> bool {
        self.flags & OP_MORE_TO_COME != 0
    }

    /// Serialize with the default limits
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_into(&CodecConfig::default(), &mut buf)?;
        Ok(buf.freeze())
    }

    /// Parse one complete frame with the default limits
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        Self::decode_with(frame, &Decoder::new())
    }

    /// Append the framed message to `dst`; on error `dst` is left as it was
    pub fn encode_into(&self, config: &CodecConfig, dst: &mut BytesMut) -> Result<()> {
        validate_flags(self.flags)?;
        let start = dst.len();
        let mut w = Writer::new(dst);
        let length_at = w.reserve_length();
        w.write_u32(self.request_id);
        w.write_u32(self.response_to);
        w.write_u32(OP_MSG_CODE);
        w.write_u32(self.flags);
        w.write_u8(PAYLOAD_SECTION_BODY);

        if let Err(e) = encode_into(config, &self.body, dst) {
            dst.truncate(start);
            return Err(e);
        }

        let total = dst.len() - start;
        if total > config.frame_limit() {
            dst.truncate(start);
            return Err(BsonError::OversizedFrame(total));
        }
        Writer::new(dst).patch_length(length_at)?;
        debug!(request_id = self.request_id, bytes = total, "Encoded OP_MSG");
        Ok(())
    }

    /// Parse one complete frame. The frame must hold exactly one message.
    pub fn decode_with(frame: &[u8], decoder: &Decoder) -> Result<Self> {
        let (header, mut reader) = read_header(frame)?;
        if header.op_code != OP_MSG_CODE {
            return Err(BsonError::InvalidOpcode(header.op_code));
        }
        let flags = reader.read_u32()?;
        validate_flags(flags)?;
        let section = reader.read_u8()?;
        if section != PAYLOAD_SECTION_BODY {
            return Err(BsonError::UnsupportedPayloadSection(section));
        }

        let body = decoder.decode_from(&mut reader).map_err(|e| match e {
            BsonError::Truncated(constants::ERR_SHORT_DOCUMENT) => {
                BsonError::Truncated(constants::ERR_BODY_OVERRUN)
            }
            other => other,
        })?;
        if let Some(next) = reader.peek(1) {
            return Err(BsonError::UnsupportedPayloadSection(next[0]));
        }

        debug!(
            request_id = header.request_id,
            response_to = header.response_to,
            fields = body.len(),
            "Decoded OP_MSG"
        );
        Ok(Self {
            request_id: header.request_id,
            response_to: header.response_to,
            flags,
            body,
        })
    }
}

/// Read the 16-byte standard header; the reader is bounded to the declared length
fn read_header(frame: &[u8]) -> Result<(MsgHeader, Reader<'_>)> {
    let mut reader = Reader::new(frame);
    let declared = reader.read_u32()? as usize;
    if declared < MIN_FRAME_SIZE || declared > frame.len() {
        return Err(BsonError::Truncated(constants::ERR_SHORT_FRAME));
    }
    let mut reader = Reader::new(&frame[4..declared]);
    let header = MsgHeader {
        message_length: declared as u32,
        request_id: reader.read_u32()?,
        response_to: reader.read_u32()?,
        op_code: reader.read_u32()?,
    };
    Ok((header, reader))
}

/// Zero, or exactly the more-to-come bit
pub fn validate_flags(flags: u32) -> Result<()> {
    if flags != 0 && (flags & OP_CHECKSUM != 0 || flags & !OP_MORE_TO_COME != 0) {
        return Err(BsonError::InvalidFlags(flags));
    }
    Ok(())
}
