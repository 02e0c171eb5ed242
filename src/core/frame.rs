//! Frame reassembly: deciding from the length prefix whether a complete
//! OP_MSG has arrived in a byte stream.

use crate::config::{MAX_FRAME_SIZE, MIN_DOCUMENT_LEN, OP_MSG_HEADER_LEN};

/// Smallest frame that can hold a header and an empty body
pub const MIN_FRAME_SIZE: usize = OP_MSG_HEADER_LEN + MIN_DOCUMENT_LEN;

/// Outcome of a frame-boundary check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Not enough bytes buffered yet
    NeedMore,
    /// The length prefix can never describe a valid frame
    Corrupt,
    /// A complete frame of this many bytes is at the front of the buffer
    Ready(usize),
}

/// Declared frame length, if the 4-byte prefix has arrived
#[inline]
pub fn declared_length(buffered: &[u8]) -> Option<usize> {
    buffered
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

/// Check for a complete frame under the protocol cap (0xFFFFFF bytes)
pub fn try_frame_length(buffered: &[u8]) -> FrameStatus {
    try_frame_length_with_limit(buffered, MAX_FRAME_SIZE)
}

/// Check for a complete frame under a caller-chosen cap. A cap above the
/// protocol cap is ignored in favour of it.
pub fn try_frame_length_with_limit(buffered: &[u8], max_frame_size: usize) -> FrameStatus {
    let Some(declared) = declared_length(buffered) else {
        return FrameStatus::NeedMore;
    };
    let max_frame_size = max_frame_size.min(MAX_FRAME_SIZE);
    // a prefix below the minimum would never make progress
    if declared > max_frame_size || declared < MIN_FRAME_SIZE {
        return FrameStatus::Corrupt;
    }
    if buffered.len() < declared {
        return FrameStatus::NeedMore;
    }
    FrameStatus::Ready(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_prefix_needs_more() {
        assert_eq!(try_frame_length(&[]), FrameStatus::NeedMore);
        assert_eq!(try_frame_length(&[0x20, 0, 0]), FrameStatus::NeedMore);
    }

    #[test]
    fn test_over_cap_is_corrupt() {
        let declared = 0x0100_0000u32.to_le_bytes();
        assert_eq!(try_frame_length(&declared), FrameStatus::Corrupt);

        let at_cap = 0x00FF_FFFFu32.to_le_bytes();
        assert_eq!(try_frame_length(&at_cap), FrameStatus::NeedMore);
    }

    #[test]
    fn test_undersized_prefix_is_corrupt() {
        assert_eq!(try_frame_length(&[0, 0, 0, 0]), FrameStatus::Corrupt);
        assert_eq!(try_frame_length(&[25, 0, 0, 0]), FrameStatus::Corrupt);
    }

    #[test]
    fn test_ready_when_complete() {
        let mut buf = 26u32.to_le_bytes().to_vec();
        buf.resize(25, 0);
        assert_eq!(try_frame_length(&buf), FrameStatus::NeedMore);
        buf.push(0);
        assert_eq!(try_frame_length(&buf), FrameStatus::Ready(26));
        buf.extend_from_slice(&[1, 2, 3]);
        assert_eq!(try_frame_length(&buf), FrameStatus::Ready(26));
    }

    #[test]
    fn test_custom_limit() {
        let buf = 1024u32.to_le_bytes();
        assert_eq!(try_frame_length_with_limit(&buf, 512), FrameStatus::Corrupt);
        assert_eq!(try_frame_length_with_limit(&buf, 2048), FrameStatus::NeedMore);
    }

    #[test]
    fn test_limit_cannot_exceed_protocol_cap() {
        let over = 0x0100_0000u32.to_le_bytes();
        assert_eq!(
            try_frame_length_with_limit(&over, usize::MAX),
            FrameStatus::Corrupt
        );
    }
}
