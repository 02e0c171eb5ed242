//! # bson-wire
//!
//! BSON document codec and OP_MSG framing for talking to a MongoDB-compatible
//! server over a byte stream.
//!
//! ## Components
//! - **BSON**: dynamic value model, encoder with array detection and explicit
//!   field ordering, bounds-checked decoder
//! - **Core**: OP_MSG frame boundary detection, message encode/decode and a
//!   `tokio_util` codec
//! - **Config**: wire constants plus tunable limits from TOML or environment
//! - **Utils**: logging setup and codec metrics
//!
//! ## Example
//! ```
//! use bson_wire::{Document, OpMsg, Value};
//!
//! let body = Document::new().with("ping", 1).with("$db", "admin");
//! let frame = OpMsg::new(1, body).to_bytes().unwrap();
//!
//! let msg = OpMsg::from_bytes(&frame).unwrap();
//! assert_eq!(msg.body.get("ping"), Some(&Value::Int32(1)));
//! ```

pub mod bson;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::bson::{decode, encode, encode_pairs, Document, Key, ObjectId, Value};
pub use crate::core::{try_frame_length, FrameStatus, OpMsg, OpMsgCodec};
pub use config::{BsonWireConfig, CodecConfig};
pub use error::{BsonError, Result};
