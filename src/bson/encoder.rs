//! # BSON Encoder
//!
//! Turns a [`Document`] into BSON bytes.
//!
//! Every document and array is written as a 4-byte length placeholder, its
//! elements, and a `0x00` terminator; the placeholder is patched with the real
//! length once the terminator is written.
//!
//! ## Document or array
//! A [`Value::Document`] whose keys are exactly the integers `1..=N` is written as
//! a BSON array with keys `"0".."N-1"`. Other documents keep their keys; integer
//! keys are written as decimal text.
//!
//! ## Explicit field order
//! A document carrying the reserved `__order` field (see [`Value::ordered`]) is
//! written from that field's alternating key/value sequence alone, in sequence
//! order, ignoring its other fields.
//!
//! ## Security
//! - Nesting below the root is capped at 64 levels (`TooDeep`)
//! - A failed encode leaves no partial bytes behind

use crate::bson::buffer::Writer;
use crate::bson::index::{index_key, integer_key};
use crate::bson::value::{Document, ElementType, Key, Value};
use crate::config::CodecConfig;
use crate::error::{constants, BsonError, Result};
use bytes::{Bytes, BytesMut};
use std::borrow::Cow;
use tracing::{debug, trace};

/// Reusable encoder owning its output buffer.
///
/// The buffer is reset at the start of every call; use one encoder per
/// connection or thread.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
    config: CodecConfig,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits above the protocol caps are pulled down to them
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            config: config.clamped(),
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a document
    pub fn encode(&mut self, doc: &Document) -> Result<Bytes> {
        self.buf.clear();
        encode_into(&self.config, doc, &mut self.buf)?;
        Ok(self.buf.split().freeze())
    }

    /// Encode key/value pairs as one document in exactly the given order
    pub fn encode_pairs<K: AsRef<str>>(&mut self, pairs: &[(K, Value)]) -> Result<Bytes> {
        self.buf.clear();
        encode_pairs_into(&self.config, pairs, &mut self.buf)?;
        Ok(self.buf.split().freeze())
    }
}

/// Encode a document with the default limits
pub fn encode(doc: &Document) -> Result<Bytes> {
    Encoder::new().encode(doc)
}

/// Encode ordered pairs with the default limits
pub fn encode_pairs<K: AsRef<str>>(pairs: &[(K, Value)]) -> Result<Bytes> {
    Encoder::new().encode_pairs(pairs)
}

/// Append an encoded document to `dst`. On error `dst` is left as it was.
pub fn encode_into(config: &CodecConfig, doc: &Document, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    let mut writer = DocumentWriter {
        w: Writer::new(dst),
        config,
    };
    match writer.write_document(doc, 0) {
        Ok(()) => {
            debug!(bytes = writer.w.position() - start, "Encoded bson document");
            Ok(())
        }
        Err(e) => {
            writer.w.rewind(start);
            debug!(error = %e, "Bson encode failed");
            Err(e)
        }
    }
}

/// Append ordered pairs encoded as one document to `dst`
pub fn encode_pairs_into<K: AsRef<str>>(
    config: &CodecConfig,
    pairs: &[(K, Value)],
    dst: &mut BytesMut,
) -> Result<()> {
    if pairs.is_empty() {
        return Err(BsonError::InvalidOrderedDict(
            constants::ERR_EMPTY_PAIRS.to_string(),
        ));
    }
    let start = dst.len();
    let mut writer = DocumentWriter {
        w: Writer::new(dst),
        config,
    };
    let result = writer.write_fields(
        pairs
            .iter()
            .map(|(k, v)| (Ok(Cow::Borrowed(k.as_ref().as_bytes())), v)),
        0,
    );
    if result.is_err() {
        writer.w.rewind(start);
    }
    result
}

struct DocumentWriter<'a> {
    w: Writer<'a>,
    config: &'a CodecConfig,
}

impl DocumentWriter<'_> {
    fn write_document(&mut self, doc: &Document, depth: usize) -> Result<()> {
        if let Some(order) = doc.get(&self.config.order_key) {
            return self.write_ordered(order, depth);
        }
        self.write_fields(doc.iter().map(|(k, v)| (key_bytes(k), v)), depth)
    }

    /// Length placeholder, elements, terminator, patch
    fn write_fields<'v, I>(&mut self, fields: I, depth: usize) -> Result<()>
    where
        I: Iterator<Item = (Result<Cow<'v, [u8]>>, &'v Value)>,
    {
        let offset = self.w.reserve_length();
        for (key, value) in fields {
            self.write_element(&key?, value, depth)?;
        }
        self.w.write_u8(0);
        self.w.patch_length(offset)
    }

    fn write_array<'v, I>(&mut self, items: I, depth: usize) -> Result<()>
    where
        I: Iterator<Item = &'v Value>,
    {
        let offset = self.w.reserve_length();
        for (i, value) in items.enumerate() {
            let key = index_key(i);
            self.write_element(key.as_bytes(), value, depth)?;
        }
        self.w.write_u8(0);
        self.w.patch_length(offset)
    }

    fn write_ordered(&mut self, order: &Value, depth: usize) -> Result<()> {
        let sequence = match order {
            Value::Array(items) => items,
            _ => {
                return Err(BsonError::InvalidOrderedDict(
                    constants::ERR_ORDER_NOT_ARRAY.to_string(),
                ))
            }
        };
        if sequence.len() % 2 != 0 {
            return Err(BsonError::InvalidOrderedDict(
                constants::ERR_ODD_PAIRS.to_string(),
            ));
        }
        let fields = sequence.chunks_exact(2).enumerate().map(|(i, pair)| {
            let key = match &pair[0] {
                Value::String(name) => Ok(Cow::Borrowed(name.as_slice())),
                _ => Err(BsonError::InvalidOrderedDict(format!(
                    "argument {} needs a string",
                    i * 2 + 1
                ))),
            };
            (key, &pair[1])
        });
        self.write_fields(fields, depth)
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

    fn write_key(&mut self, ty: ElementType, key: &[u8]) -> Result<()> {
        if key.contains(&0) {
            return Err(BsonError::InvalidKeyType(format!(
                "key contains NUL: {}",
                String::from_utf8_lossy(key)
            )));
        }
        self.w.write_u8(ty.tag());
        self.w.write_cstring(key);
        Ok(())
    }

    fn write_element(&mut self, key: &[u8], value: &Value, depth: usize) -> Result<()> {
        trace!(key = %String::from_utf8_lossy(key), "Encoding element");
        match value {
            Value::Null => self.write_key(ElementType::Null, key),
            Value::MinKey => self.write_key(ElementType::MinKey, key),
            Value::MaxKey => self.write_key(ElementType::MaxKey, key),
            Value::Boolean(b) => {
                self.write_key(ElementType::Boolean, key)?;
                self.w.write_u8(u8::from(*b));
                Ok(())
            }
            Value::Int32(v) => {
                self.write_key(ElementType::Int32, key)?;
                self.w.write_i32(*v);
                Ok(())
            }
            Value::Int64(v) => {
                self.write_key(ElementType::Int64, key)?;
                self.w.write_i64(*v);
                Ok(())
            }
            Value::Timestamp(v) => {
                self.write_key(ElementType::Timestamp, key)?;
                self.w.write_i64(*v);
                Ok(())
            }
            Value::Double(v) => {
                self.write_key(ElementType::Double, key)?;
                self.w.write_f64(*v);
                Ok(())
            }
            Value::Date(seconds) => {
                let millis = seconds.checked_mul(1000).ok_or_else(|| {
                    BsonError::InvalidValueType(format!("date out of range: {seconds}"))
                })?;
                self.write_key(ElementType::Date, key)?;
                self.w.write_i64(millis);
                Ok(())
            }
            Value::String(bytes) => {
                let len = wire_len(bytes.len() + 1)?;
                self.write_key(ElementType::String, key)?;
                self.w.write_i32(len);
                self.w.write_cstring(bytes);
                Ok(())
            }
            Value::Binary { subtype, bytes } => {
                let len = wire_len(bytes.len())?;
                self.write_key(ElementType::Binary, key)?;
                self.w.write_i32(len);
                self.w.write_u8(*subtype);
                self.w.push_bytes(bytes);
                Ok(())
            }
            Value::ObjectId(oid) => {
                self.write_key(ElementType::ObjectId, key)?;
                self.w.push_bytes(oid.bytes());
                Ok(())
            }
            Value::Regex { pattern, options } => {
                if pattern.contains('\0') || options.contains('\0') {
                    return Err(BsonError::InvalidValueType(
                        "regex pattern or options contain NUL".to_string(),
                    ));
                }
                self.write_key(ElementType::Regex, key)?;
                self.w.write_cstring(pattern.as_bytes());
                self.w.write_cstring(options.as_bytes());
                Ok(())
            }
            Value::Array(items) => {
                let depth = self.enter(depth)?;
                self.write_key(ElementType::Array, key)?;
                self.write_array(items.iter(), depth)
            }
            Value::Document(doc) => {
                let depth = self.enter(depth)?;
                if doc.get(&self.config.order_key).is_none() {
                    if let Some(items) = doc.as_sequence() {
                        self.write_key(ElementType::Array, key)?;
                        return self.write_array(items.into_iter(), depth);
                    }
                }
                self.write_key(ElementType::Document, key)?;
                self.write_document(doc, depth)
            }
            Value::Raw { tag, payload } => {
                let ty = ElementType::try_from(*tag).map_err(|_| {
                    BsonError::InvalidValueType(format!("unknown raw type tag: {tag}"))
                })?;
                self.write_key(ty, key)?;
                self.w.push_bytes(payload);
                Ok(())
            }
        }
    }
}

fn key_bytes(key: &Key) -> Result<Cow<'_, [u8]>> {
    match key {
        Key::Name(name) => Ok(Cow::Borrowed(name.as_bytes())),
        Key::Index(i) => Ok(match integer_key(*i) {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        }),
        Key::Number(n) => Err(BsonError::InvalidKeyType(format!("number key {n}"))),
    }
}

fn wire_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| BsonError::InvalidValueType(format!("{len} bytes exceeds i32 length")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::bson::object_id::ObjectId;

    fn nested(levels: usize) -> Document {
        let mut doc = Document::new().with("leaf", 1);
        for _ in 0..levels {
            doc = Document::new().with("child", doc);
        }
        doc
    }

    #[test]
    fn test_empty_document() {
        let bytes = encode(&Document::new()).unwrap();
        assert_eq!(&bytes[..], &[5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_scalar_layouts() {
        let doc = Document::new()
            .with("i", 1)
            .with("b", true)
            .with("s", "hi")
            .with("n", Value::Null);
        let bytes = encode(&doc).unwrap();
        let expected: Vec<u8> = [
            &[29u8, 0, 0, 0][..],
            &[16, b'i', 0, 1, 0, 0, 0],
            &[8, b'b', 0, 1],
            &[2, b's', 0, 3, 0, 0, 0, b'h', b'i', 0],
            &[10, b'n', 0],
            &[0],
        ]
        .concat();
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_array_discriminator() {
        let doc = Document::new().with(
            "a",
            Document::new().with(1, 10).with(2, 20).with(3, 30),
        );
        let bytes = encode(&doc).unwrap();
        // tag of the single element
        assert_eq!(bytes[4], ElementType::Array.tag());
        let inner = &bytes[7..];
        assert_eq!(inner[4], ElementType::Int32.tag());
        assert_eq!(&inner[5..7], b"0\0");
        assert_eq!(&inner[11..14], &[16, b'1', 0]);
        assert_eq!(&inner[18..21], &[16, b'2', 0]);
    }

    #[test]
    fn test_explicit_array_matches_discriminated_array() {
        let by_keys = Document::new().with("a", Document::new().with(1, "x").with(2, "y"));
        let by_vec = Document::new().with("a", vec![Value::from("x"), Value::from("y")]);
        assert_eq!(encode(&by_keys).unwrap(), encode(&by_vec).unwrap());
    }

    #[test]
    fn test_sparse_integer_keys_stay_document() {
        let doc = Document::new().with("a", Document::new().with(1, "x").with(3, "y"));
        let bytes = encode(&doc).unwrap();
        assert_eq!(bytes[4], ElementType::Document.tag());
    }

    #[test]
    fn test_depth_boundary() {
        assert!(encode(&nested(64)).is_ok());
        assert!(matches!(
            encode(&nested(65)),
            Err(BsonError::TooDeep { depth: 65, max: 64 })
        ));
    }

    #[test]
    fn test_configured_depth_limit() {
        let config = CodecConfig {
            max_depth: 2,
            ..CodecConfig::default()
        };
        let mut encoder = Encoder::with_config(config);
        assert!(encoder.encode(&nested(2)).is_ok());
        assert!(matches!(
            encoder.encode(&nested(3)),
            Err(BsonError::TooDeep { depth: 3, .. })
        ));
    }

    #[test]
    fn test_depth_limit_cannot_be_loosened() {
        let config = CodecConfig {
            max_depth: 1000,
            ..CodecConfig::default()
        };
        let mut encoder = Encoder::with_config(config);
        assert_eq!(encoder.config().max_depth, 64);
        assert!(matches!(
            encoder.encode(&nested(65)),
            Err(BsonError::TooDeep { depth: 65, max: 64 })
        ));
    }

    #[test]
    fn test_custom_order_key() {
        let config = CodecConfig {
            order_key: "$order".to_string(),
            ..CodecConfig::default()
        };
        let ordered = Value::ordered_with("$order", [("b", Value::from(2)), ("a", Value::from(1))]);
        let doc = ordered.as_document().unwrap();
        let bytes = Encoder::with_config(config).encode(doc).unwrap();
        assert_eq!(&bytes[4..7], &[16, b'b', 0]);
        let a_pos = bytes.windows(2).position(|w| w == b"a\0").unwrap();
        assert!(a_pos > 7);
        assert!(!bytes.windows(6).any(|w| w == b"$order"));
    }

    #[test]
    fn test_ordered_fields() {
        let doc = Document::new()
            .with("a", 1)
            .with("b", 2)
            .with(
                "__order",
                vec![Value::from("b"), Value::from(2), Value::from("a"), Value::from(1)],
            );
        let bytes = encode(&doc).unwrap();
        let b_pos = bytes.windows(2).position(|w| w == b"b\0").unwrap();
        let a_pos = bytes.windows(2).position(|w| w == b"a\0").unwrap();
        assert!(b_pos < a_pos);
        // the order field itself is not emitted
        assert!(!bytes.windows(7).any(|w| w == b"__order"));
    }

    #[test]
    fn test_ordered_field_errors() {
        let odd = Document::new().with("__order", vec![Value::from("a")]);
        assert!(matches!(encode(&odd), Err(BsonError::InvalidOrderedDict(_))));

        let bad_key = Document::new().with("__order", vec![Value::from(1), Value::from(2)]);
        assert!(matches!(
            encode(&bad_key),
            Err(BsonError::InvalidOrderedDict(_))
        ));

        let not_array = Document::new().with("__order", "a");
        assert!(matches!(
            encode(&not_array),
            Err(BsonError::InvalidOrderedDict(_))
        ));
    }

    #[test]
    fn test_encode_pairs_keeps_order() {
        let bytes = encode_pairs(&[("find", Value::from("users")), ("$db", Value::from("app"))])
            .unwrap();
        assert_eq!(bytes[4], ElementType::String.tag());
        assert_eq!(&bytes[5..10], b"find\0");
        assert!(matches!(
            encode_pairs::<&str>(&[]),
            Err(BsonError::InvalidOrderedDict(_))
        ));
    }

    #[test]
    fn test_number_and_nul_keys_rejected() {
        let doc = Document::new().with(Key::Number(1.5), 1);
        assert!(matches!(encode(&doc), Err(BsonError::InvalidKeyType(_))));

        let doc = Document::new().with("a\0b", 1);
        assert!(matches!(encode(&doc), Err(BsonError::InvalidKeyType(_))));
    }

    #[test]
    fn test_integer_keys_written_as_text() {
        let doc = Document::new().with(0, "zero").with(7, "seven");
        let bytes = encode(&doc).unwrap();
        assert_eq!(&bytes[4..7], &[2, b'0', 0]);
    }

    #[test]
    fn test_object_id_and_date() {
        let oid = ObjectId::parse_hex("507f1f77bcf86cd799439011").unwrap();
        let doc = Document::new().with("_id", oid).with("at", Value::date(2));
        let bytes = encode(&doc).unwrap();
        assert_eq!(&bytes[4..9], &[7, b'_', b'i', b'd', 0]);
        assert_eq!(&bytes[9..21], oid.bytes());
        assert_eq!(&bytes[21..25], &[9, b'a', b't', 0]);
        assert_eq!(&bytes[25..33], &2000i64.to_le_bytes());
    }

    #[test]
    fn test_raw_payload_copied_verbatim() {
        let doc = Document::new().with("n", Value::raw(ElementType::Int64, 5i64.to_le_bytes()));
        let bytes = encode(&doc).unwrap();
        assert_eq!(bytes[4], ElementType::Int64.tag());
        assert_eq!(&bytes[7..15], &5i64.to_le_bytes());

        let bad = Document::new().with("n", Value::Raw { tag: 6, payload: vec![] });
        assert!(matches!(encode(&bad), Err(BsonError::InvalidValueType(_))));
    }

    #[test]
    fn test_failed_encode_leaves_buffer_untouched() {
        let mut dst = BytesMut::from(&b"prefix"[..]);
        let bad = Document::new().with("ok", 1).with(Key::Number(0.5), 2);
        assert!(encode_into(&CodecConfig::default(), &bad, &mut dst).is_err());
        assert_eq!(&dst[..], b"prefix");
    }
}
