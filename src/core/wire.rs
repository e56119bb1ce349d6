//! Frame-data wire format.
//!
//! The producer frames every preview image in a fixed 24-byte big-endian
//! header followed by the encoded image bytes:
//!
//! ```text
//! [0,4)    unused (reserved by the transport)
//! [4,8)    u32 frame index
//! [8,9)    u8 id length
//! [9,9+n)  UTF-8 stream id (n = id length, at most 15)
//! [..24)   zero padding
//! [24,..)  encoded image (JPEG/PNG)
//! ```
//!
//! The id region is a Pascal-style string packed into 16 bytes, which caps
//! composite ids at 15 bytes on the wire.

/// Total header length; image bytes start here.
pub const HEADER_LEN: usize = 24;

const INDEX_OFFSET: usize = 4;
const ID_LEN_OFFSET: usize = 8;
const ID_OFFSET: usize = 9;

/// Decoding failures. All of them drop the message; none are retried.
#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    /// Payload shorter than the fixed header.
    Truncated { len: usize },
    /// Declared id length runs past the header.
    IdOverflow { len: usize },
    /// Id bytes are not valid UTF-8.
    IdEncoding,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Truncated { len } => {
                write!(f, "frame message truncated: {} bytes, need {}", len, HEADER_LEN)
            }
            WireError::IdOverflow { len } => {
                write!(f, "stream id length {} exceeds header bounds", len)
            }
            WireError::IdEncoding => write!(f, "stream id is not valid UTF-8"),
        }
    }
}

impl std::error::Error for WireError {}

/// One decoded frame message, borrowing the payload.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameMessage<'a> {
    pub stream_id: &'a str,
    pub frame_index: u32,
    pub image_bytes: &'a [u8],
}

/// Parse a raw frame-data payload. The image bytes are not validated here;
/// decode happens later on the worker pool.
pub fn decode_frame_message(payload: &[u8]) -> Result<FrameMessage<'_>, WireError> {
    if payload.len() < HEADER_LEN {
        return Err(WireError::Truncated { len: payload.len() });
    }

    let frame_index = u32::from_be_bytes([
        payload[INDEX_OFFSET],
        payload[INDEX_OFFSET + 1],
        payload[INDEX_OFFSET + 2],
        payload[INDEX_OFFSET + 3],
    ]);

    let id_len = payload[ID_LEN_OFFSET] as usize;
    if ID_OFFSET + id_len > HEADER_LEN {
        return Err(WireError::IdOverflow { len: id_len });
    }

    let stream_id = std::str::from_utf8(&payload[ID_OFFSET..ID_OFFSET + id_len])
        .map_err(|_| WireError::IdEncoding)?;

    Ok(FrameMessage {
        stream_id,
        frame_index,
        image_bytes: &payload[HEADER_LEN..],
    })
}

/// Build a frame-data payload. The producer side of
/// [`decode_frame_message`]; used by the demo feeder and tests.
pub fn encode_frame_message(stream_id: &str, frame_index: u32, image_bytes: &[u8]) -> Vec<u8> {
    debug_assert!(stream_id.len() <= HEADER_LEN - ID_OFFSET);

    let mut out = vec![0u8; HEADER_LEN];
    out[INDEX_OFFSET..INDEX_OFFSET + 4].copy_from_slice(&frame_index.to_be_bytes());
    out[ID_LEN_OFFSET] = stream_id.len() as u8;
    out[ID_OFFSET..ID_OFFSET + stream_id.len()].copy_from_slice(stream_id.as_bytes());
    out.extend_from_slice(image_bytes);
    out
}
