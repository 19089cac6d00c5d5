//! Datagram wire format
//!
//! Every datagram carries exactly one media frame:
//!
//! ```text
//! [1 byte kind: b'V' | b'A'][8 bytes payload length, u64 LE][payload]
//! ```
//!
//! There is no framing across datagram boundaries. UDP gives no ordering
//! or delivery guarantee, so partial-frame reassembly is not supported;
//! anything that does not match the header exactly is [`Decoded::Invalid`]
//! and is counted as a lost packet by the caller, never propagated as an
//! error.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Wire header size: kind tag + length field
pub const HEADER_LEN: usize = 9;

/// Kind tag for video frames
pub const KIND_VIDEO: u8 = b'V';

/// Kind tag for audio frames
pub const KIND_AUDIO: u8 = b'A';

/// Media frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Self-contained JPEG still image
    Video,
    /// Fixed-size chunk of i16 mono PCM samples
    Audio,
}

impl FrameKind {
    /// Wire tag byte for this kind
    pub fn tag(self) -> u8 {
        match self {
            FrameKind::Video => KIND_VIDEO,
            FrameKind::Audio => KIND_AUDIO,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            KIND_VIDEO => Some(FrameKind::Video),
            KIND_AUDIO => Some(FrameKind::Audio),
            _ => None,
        }
    }
}

/// One decoded media frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

/// Outcome of decoding one datagram
///
/// `Invalid` is a count-as-lost condition, not an error: the receiver
/// increments its loss counter and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Frame(Frame),
    Invalid,
}

/// Encode a payload into a self-delimited datagram
pub fn encode(kind: FrameKind, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(kind.tag());
    buf.put_u64_le(payload.len() as u64);
    buf.put_slice(payload);
    buf.freeze()
}

/// Decode one datagram
///
/// Rejects undersized input, unknown kind tags, and any length-field
/// mismatch (UDP can deliver truncated datagrams). Never panics.
pub fn decode(datagram: &[u8]) -> Decoded {
    if datagram.len() < HEADER_LEN {
        return Decoded::Invalid;
    }

    let mut buf = datagram;
    let tag = buf.get_u8();
    let kind = match FrameKind::from_tag(tag) {
        Some(kind) => kind,
        None => return Decoded::Invalid,
    };
    let declared = buf.get_u64_le();

    if buf.len() as u64 != declared {
        return Decoded::Invalid;
    }

    Decoded::Frame(Frame {
        kind,
        payload: Bytes::copy_from_slice(buf),
    })
}
