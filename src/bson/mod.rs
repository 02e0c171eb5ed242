//! # BSON Codec
//!
//! Encoding and decoding of BSON documents.
//!
//! ## Components
//! - **Value**: the tagged value model and wire type tags
//! - **Encoder**: value tree to BSON bytes
//! - **Decoder**: BSON bytes to value tree
//! - **Buffer**: little-endian writer with length patching, bounds-checked reader
//!
//! ## Wire Format
//! ```text
//! document = [Length(4)] [Element]* [0x00]
//! element  = [Tag(1)] [Key(cstring)] [Payload]
//! ```
//!
//! ## Security
//! - Nesting capped at 64 levels in both directions
//! - Every read is bounds-checked against the declared document length

pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod index;
pub mod object_id;
pub mod value;

pub use decoder::{decode, Decoder};
pub use encoder::{encode, encode_pairs, Encoder};
pub use object_id::ObjectId;
pub use value::{Document, ElementType, Key, Value};
