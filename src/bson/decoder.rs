//! # BSON Decoder
//!
//! Parses BSON bytes into a [`Document`].
//!
//! Each document is bounded by its declared length: elements are read from
//! exactly that many bytes and the terminator must be the last of them. Any
//! failure aborts the whole decode; no partial document is returned.
//!
//! ## Keys
//! - Document keys that read as integers become [`Key::Index`], other numbers
//!   [`Key::Number`], everything else [`Key::Name`]
//! - Array keys must be decimal integers. Keys `"0".."N-1"` in order produce a
//!   [`Value::Array`]; any other layout produces a [`Value::Document`] keyed by the
//!   1-based indices
//!
//! ## Dates
//! The wire carries milliseconds; decoded dates are whole seconds, truncated.

use crate::bson::buffer::Reader;
use crate::bson::object_id::ObjectId;
use crate::bson::value::{Document, ElementType, Key, Value};
use crate::config::{CodecConfig, MIN_DOCUMENT_LEN};
use crate::error::{constants, BsonError, Result};
use tracing::{debug, trace};

/// Decoder carrying the nesting limit
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: CodecConfig,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits above the protocol caps are pulled down to them
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config: config.clamped(),
        }
    }

    /// Decode the document at the start of `bytes`.
    ///
    /// Bytes after the first document are not examined.
    pub fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let mut reader = Reader::new(bytes);
        let doc = self.decode_from(&mut reader).map_err(|e| {
            debug!(error = %e, len = bytes.len(), "Bson decode failed");
            e
        })?;
        debug!(fields = doc.len(), "Decoded bson document");
        Ok(doc)
    }

    /// Decode one document from the reader, consuming exactly its declared length
    pub(crate) fn decode_from(&self, reader: &mut Reader<'_>) -> Result<Document> {
        self.read_document(reader, 0)
    }

    /// Length prefix, then a reader over the rest of the document
    fn read_body<'a>(&self, reader: &mut Reader<'a>) -> Result<Reader<'a>> {
        let declared = reader.read_u32()? as usize;
        if declared < MIN_DOCUMENT_LEN {
            return Err(BsonError::Truncated(constants::ERR_SHORT_DOCUMENT));
        }
        let body = reader
            .read_bytes(declared - 4)
            .map_err(|_| BsonError::Truncated(constants::ERR_SHORT_DOCUMENT))?;
        Ok(Reader::new(body))
    }

    fn read_document(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Document> {
        let mut body = self.read_body(reader)?;
        let mut doc = Document::new();
        while let Some((key, value)) = self.read_element(&mut body, depth)? {
            let key = std::str::from_utf8(key).map_err(|_| BsonError::InvalidCString)?;
            doc.insert(Key::from_wire(key), value);
        }
        Ok(doc)
    }

    fn read_array(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Value> {
        let mut body = self.read_body(reader)?;
        let mut items = Vec::new();
        let mut dense = true;
        while let Some((key, value)) = self.read_element(&mut body, depth)? {
            let index = parse_index(key)?;
            dense &= index == items.len() as i64;
            items.push((index, value));
        }

        if dense {
            return Ok(Value::Array(items.into_iter().map(|(_, v)| v).collect()));
        }
        trace!(len = items.len(), "Array keys not dense, decoding as document");
        let mut doc = Document::with_capacity(items.len());
        for (index, value) in items {
            doc.insert(Key::Index(index.saturating_add(1)), value);
        }
        Ok(Value::Document(doc))
    }

    /// One element, or `None` at the terminator
    fn read_element<'a>(
        &self,
        body: &mut Reader<'a>,
        depth: usize,
    ) -> Result<Option<(&'a [u8], Value)>> {
        let tag = body
            .read_u8()
            .map_err(|_| BsonError::Truncated(constants::ERR_SHORT_DOCUMENT))?;
        if tag == 0 {
            if !body.is_empty() {
                return Err(BsonError::Truncated(constants::ERR_LENGTH_MISMATCH));
            }
            return Ok(None);
        }
        let ty = ElementType::try_from(tag)?;
        let key = body.read_cstring()?;

        let value = match ty {
            ElementType::Double => Value::Double(body.read_f64()?),
            ElementType::Boolean => Value::Boolean(body.read_u8()? != 0),
            ElementType::Int32 => Value::Int32(body.read_i32()?),
            ElementType::Int64 => Value::Int64(body.read_i64()?),
            ElementType::Timestamp => Value::Timestamp(body.read_i64()?),
            ElementType::Date => Value::Date(body.read_i64()? / 1000),
            ElementType::ObjectId => Value::ObjectId(ObjectId::from_slice(
                body.read_bytes(ObjectId::LEN)?,
            )?),
            ElementType::String | ElementType::JsCode => Value::String(read_string(body)?),
            ElementType::Binary => {
                let len = usize::try_from(body.read_i32()?)
                    .map_err(|_| BsonError::Truncated(constants::ERR_SHORT_BYTES))?;
                let subtype = body.read_u8()?;
                let bytes = body.read_bytes(len)?.to_vec();
                Value::Binary { subtype, bytes }
            }
            ElementType::Regex => {
                let pattern = read_text(body)?;
                let options = read_text(body)?;
                Value::Regex { pattern, options }
            }
            ElementType::Document => {
                let depth = self.enter(depth)?;
                Value::Document(self.read_document(body, depth)?)
            }
            ElementType::Array => {
                let depth = self.enter(depth)?;
                self.read_array(body, depth)?
            }
            ElementType::MinKey => Value::MinKey,
            ElementType::MaxKey => Value::MaxKey,
            ElementType::Null => Value::Null,
        };
        Ok(Some((key, value)))
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        let next = depth + 1;
        let max = self.config.depth_limit();
        if next > max {
            return Err(BsonError::TooDeep {
                depth: next,
                max,
            });
        }
        Ok(next)
    }
}

/// Decode a document with the default limits
pub fn decode(bytes: &[u8]) -> Result<Document> {
    Decoder::new().decode(bytes)
}

/// Length-prefixed string: i32 length including the NUL, bytes, NUL
fn read_string(body: &mut Reader<'_>) -> Result<Vec<u8>> {
    let len = body.read_i32()?;
    if len <= 0 {
        return Err(BsonError::Truncated(constants::ERR_EMPTY_STRING));
    }
    let bytes = body.read_bytes(len as usize - 1)?.to_vec();
    if body.read_u8()? != 0 {
        return Err(BsonError::InvalidCString);
    }
    Ok(bytes)
}

fn read_text(body: &mut Reader<'_>) -> Result<String> {
    let raw = body.read_cstring()?;
    String::from_utf8(raw.to_vec()).map_err(|_| BsonError::InvalidCString)
}

/// Array keys are plain decimal digits
fn parse_index(key: &[u8]) -> Result<i64> {
    if key.is_empty() || !key.iter().all(u8::is_ascii_digit) {
        return Err(BsonError::InvalidCString);
    }
    std::str::from_utf8(key)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(BsonError::InvalidCString)
}
