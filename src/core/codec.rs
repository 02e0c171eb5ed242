//! Stream codec for OP_MSG frames.
//!
//! Plugs frame reassembly into `tokio_util::codec` so a socket can be wrapped in
//! `Framed<_, OpMsgCodec>`. Decoding waits for a complete frame, consumes exactly
//! that frame and validates it; a length prefix that can never be valid is
//! reported as an error and leaves the buffer untouched for the caller to
//! discard with the connection.

use crate::bson::decoder::Decoder as BsonDecoder;
use crate::config::CodecConfig;
use crate::core::frame::{declared_length, try_frame_length_with_limit, FrameStatus};
use crate::core::message::OpMsg;
use crate::error::{constants, BsonError};
use crate::utils::metrics::{global_metrics, CodecMetrics};
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// OP_MSG framing codec, one per connection
#[derive(Debug, Clone)]
pub struct OpMsgCodec {
    config: CodecConfig,
    decoder: BsonDecoder,
    metrics: &'static CodecMetrics,
}

impl Default for OpMsgCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl OpMsgCodec {
    /// Limits above the protocol caps are pulled down to them
    pub fn new(config: CodecConfig) -> Self {
        let config = config.clamped();
        Self {
            decoder: BsonDecoder::with_config(config.clone()),
            config,
            metrics: global_metrics(),
        }
    }

    /// Record into `metrics` instead of the global instance
    pub fn with_metrics(mut self, metrics: &'static CodecMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn write_frame(&self, item: &OpMsg, dst: &mut BytesMut) -> Result<(), BsonError> {
        let start = dst.len();
        match item.encode_into(&self.config, dst) {
            Ok(()) => {
                self.metrics.frame_encoded((dst.len() - start) as u64);
                Ok(())
            }
            Err(e) => {
                self.metrics.encode_error();
                warn!(error = %e, request_id = item.request_id, "Failed to encode OP_MSG");
                Err(e)
            }
        }
    }
}

impl Decoder for OpMsgCodec {
    type Item = OpMsg;
    type Error = BsonError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match try_frame_length_with_limit(src, self.config.max_frame_size) {
            FrameStatus::NeedMore => {
                if let Some(declared) = declared_length(src) {
                    src.reserve(declared.saturating_sub(src.len()));
                }
                trace!(buffered = src.len(), "Waiting for complete frame");
                Ok(None)
            }
            FrameStatus::Corrupt => {
                self.metrics.corrupt_frame();
                let declared = declared_length(src).unwrap_or_default();
                warn!(declared, max = self.config.max_frame_size, "Rejected frame length");
                if declared > self.config.max_frame_size {
                    Err(BsonError::OversizedFrame(declared))
                } else {
                    Err(BsonError::Truncated(constants::ERR_SHORT_FRAME))
                }
            }
            FrameStatus::Ready(len) => {
                let frame = src.split_to(len);
                match OpMsg::decode_with(&frame, &self.decoder) {
                    Ok(msg) => {
                        self.metrics.frame_decoded(len as u64);
                        Ok(Some(msg))
                    }
                    Err(e) => {
                        self.metrics.decode_error();
                        warn!(error = %e, len, "Rejected OP_MSG frame");
                        Err(e)
                    }
                }
            }
        }
    }
}

impl Encoder<OpMsg> for OpMsgCodec {
    type Error = BsonError;

    fn encode(&mut self, item: OpMsg, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_frame(&item, dst)
    }
}

impl Encoder<&OpMsg> for OpMsgCodec {
    type Error = BsonError;

    fn encode(&mut self, item: &OpMsg, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_frame(item, dst)
    }
}
