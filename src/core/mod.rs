//! # Core Protocol Components
//!
//! OP_MSG framing over byte streams.
//!
//! ## Components
//! - **Frame**: length-prefix check deciding need-more / corrupt / ready
//! - **Message**: OP_MSG header layout, validation and body encoding
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Length(4)] [RequestId(4)] [ResponseTo(4)] [OpCode(4)] [Flags(4)] [Section(1)] [Body(N)]
//! ```
//!
//! ## Security
//! - Maximum frame size: 16MB - 1 (prevents memory exhaustion)
//! - Length validation before allocation

pub mod codec;
pub mod frame;
pub mod message;

pub use codec::OpMsgCodec;
pub use frame::{try_frame_length, FrameStatus};
pub use message::{MsgHeader, OpMsg};
