//! # Value Model
//!
//! The tagged representation every document element is converted to and from.
//!
//! A [`Document`] is an ordered mapping of [`Key`] to [`Value`]. Keys are either
//! names or integers, matching the table model of the hosts this codec serves: a
//! document whose keys are exactly the integers `1..=N` is written to the wire as
//! a BSON array, anything else as a BSON document.

use crate::bson::object_id::ObjectId;
use crate::config::ORDER_KEY;
use crate::error::{BsonError, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// One-byte wire tag of a BSON element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = 1,
    String = 2,
    Document = 3,
    Array = 4,
    Binary = 5,
    ObjectId = 7,
    Boolean = 8,
    Date = 9,
    Null = 10,
    Regex = 11,
    JsCode = 13,
    Int32 = 16,
    Timestamp = 17,
    Int64 = 18,
    MaxKey = 127,
    MinKey = 255,
}

impl ElementType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ElementType {
    type Error = BsonError;

    fn try_from(tag: u8) -> Result<Self> {
        let ty = match tag {
            1 => ElementType::Double,
            2 => ElementType::String,
            3 => ElementType::Document,
            4 => ElementType::Array,
            5 => ElementType::Binary,
            7 => ElementType::ObjectId,
            8 => ElementType::Boolean,
            9 => ElementType::Date,
            10 => ElementType::Null,
            11 => ElementType::Regex,
            13 => ElementType::JsCode,
            16 => ElementType::Int32,
            17 => ElementType::Timestamp,
            18 => ElementType::Int64,
            127 => ElementType::MaxKey,
            255 => ElementType::MinKey,
            other => return Err(BsonError::InvalidType(other)),
        };
        Ok(ty)
    }
}

/// A document key.
///
/// Decoded key text that reads as an integer becomes [`Key::Index`], text that
/// reads as any other number becomes [`Key::Number`]. Number keys have no wire
/// form of their own and are rejected by the encoder.
#[derive(Debug, Clone)]
pub enum Key {
    Index(i64),
    Number(f64),
    Name(String),
}

impl Key {
    /// Classify key text read from the wire
    pub fn from_wire(text: &str) -> Self {
        if let Ok(index) = text.parse::<i64>() {
            return Key::Index(index);
        }
        match text.parse::<f64>() {
            // "inf"/"nan" spellings stay names
            Ok(number) if number.is_finite() => Key::Number(number),
            _ => Key::Name(text.to_string()),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Index(a), Key::Index(b)) => a == b,
            (Key::Number(a), Key::Number(b)) => a.to_bits() == b.to_bits(),
            (Key::Name(a), Key::Name(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Index(i) => i.hash(state),
            Key::Number(n) => n.to_bits().hash(state),
            Key::Name(s) => s.hash(state),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<i64> for Key {
    fn from(index: i64) -> Self {
        Key::Index(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        Key::Index(i64::from(index))
    }
}

/// Ordered mapping of unique keys to values
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(Key, Value)>,
    positions: HashMap<Key, usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace a field. A replaced field keeps its original position.
    pub fn insert<K: Into<Key>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(&pos) = self.positions.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Builder-style insert
    pub fn with<K: Into<Key>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_key(&Key::Name(name.to_string()))
    }

    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in index order when the keys are exactly `1..=len`, otherwise `None`.
    ///
    /// An empty document is never array-like.
    pub fn as_sequence(&self) -> Option<Vec<&Value>> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        let mut slots: Vec<Option<&Value>> = vec![None; len];
        for (key, value) in &self.entries {
            match key {
                Key::Index(i) if *i >= 1 && (*i as u64) <= len as u64 => {
                    slots[(*i - 1) as usize] = Some(value);
                }
                _ => return None,
            }
        }
        // keys are unique, so `len` in-range indices fill every slot
        slots.into_iter().collect()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (Key, Value);
    type IntoIter = std::vec::IntoIter<(Key, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A BSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    /// Raw string bytes; BSON strings are UTF-8 by convention only
    String(Vec<u8>),
    Binary { subtype: u8, bytes: Vec<u8> },
    ObjectId(ObjectId),
    /// Whole seconds since the epoch
    Date(i64),
    Timestamp(i64),
    Regex { pattern: String, options: String },
    MinKey,
    MaxKey,
    Document(Document),
    /// Elements in order; element `i` is index `i + 1` to callers
    Array(Vec<Value>),
    /// An already-serialized payload written verbatim under `tag`. Encode-only.
    Raw { tag: u8, payload: Vec<u8> },
}

impl Value {
    /// Date from whole seconds since the epoch
    pub fn date(seconds: i64) -> Self {
        Value::Date(seconds)
    }

    /// Force the 8-byte integer encoding regardless of magnitude
    pub fn int64(value: i64) -> Self {
        Value::Int64(value)
    }

    pub fn object_id(hex: &str) -> Result<Self> {
        ObjectId::parse_hex(hex).map(Value::ObjectId)
    }

    /// Generic binary (subtype 0)
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary {
            subtype: 0,
            bytes: bytes.into(),
        }
    }

    pub fn regex(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Value::Regex {
            pattern: pattern.into(),
            options: options.into(),
        }
    }

    pub fn raw(tag: ElementType, payload: impl Into<Vec<u8>>) -> Self {
        Value::Raw {
            tag: tag.tag(),
            payload: payload.into(),
        }
    }

    /// A document whose fields are written strictly in the given order, under
    /// the default `__order` key
    pub fn ordered<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::ordered_with(ORDER_KEY, pairs)
    }

    /// As [`Value::ordered`], for an encoder configured with another `order_key`
    pub fn ordered_with<K, I>(order_key: &str, pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut sequence = Vec::new();
        for (key, value) in pairs {
            sequence.push(Value::String(key.into().into_bytes()));
            sequence.push(value);
        }
        Value::Document(Document::new().with(order_key, Value::Array(sequence)))
    }

    /// Wire tag this value encodes under, `None` for array-like documents
    /// whose tag depends on their keys and for raw values with unknown tags.
    pub fn element_type(&self) -> Option<ElementType> {
        let ty = match self {
            Value::Null => ElementType::Null,
            Value::Boolean(_) => ElementType::Boolean,
            Value::Int32(_) => ElementType::Int32,
            Value::Int64(_) => ElementType::Int64,
            Value::Double(_) => ElementType::Double,
            Value::String(_) => ElementType::String,
            Value::Binary { .. } => ElementType::Binary,
            Value::ObjectId(_) => ElementType::ObjectId,
            Value::Date(_) => ElementType::Date,
            Value::Timestamp(_) => ElementType::Timestamp,
            Value::Regex { .. } => ElementType::Regex,
            Value::MinKey => ElementType::MinKey,
            Value::MaxKey => ElementType::MaxKey,
            Value::Array(_) => ElementType::Array,
            Value::Document(doc) => {
                if doc.as_sequence().is_some() {
                    ElementType::Array
                } else {
                    ElementType::Document
                }
            }
            Value::Raw { tag, .. } => return ElementType::try_from(*tag).ok(),
        };
        Some(ty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Either integer width
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// 1-based element access for arrays and array-like documents
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => index.checked_sub(1).and_then(|i| items.get(i)),
            Value::Document(doc) => i64::try_from(index)
                .ok()
                .and_then(|i| doc.get_key(&Key::Index(i))),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

/// Integers narrow to the 4-byte encoding when they fit
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        match i32::try_from(v) {
            Ok(narrow) => Value::Int32(narrow),
            Err(_) => Value::Int64(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v.into_bytes())
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
