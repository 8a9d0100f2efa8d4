//! Sans-I/O BGP wire framing: the marker/length/type header, independent of
//! any transport. [`crate::codec::Codec`] is the tokio-util adapter built on
//! top of this.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::endec::MessageType;
use crate::{Error, HEADER_LEN, MARKER};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;

/// One framed PDU: its message type code and opaque body (header stripped).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: MessageType,
    pub body: Bytes,
}

/// Strip one complete BGP PDU off the front of `src`, if present.
///
/// `max_message_len` bounds the allowed header+body length: [`crate::DEFAULT_MAX_MESSAGE_LEN`]
/// until Extended Message (RFC 8654) has been negotiated with the peer, then
/// up to [`crate::EXTENDED_MAX_MESSAGE_LEN`]. Returns `Ok(None)` when `src`
/// does not yet hold a complete frame; callers should read more bytes from
/// the transport and retry.
pub fn try_frame(src: &mut BytesMut, max_message_len: usize) -> Result<Option<Frame>, Error> {
    if src.len() < HEADER_LEN {
        return Ok(None);
    }
    if src[..16] != MARKER {
        return Err(Error::Marker);
    }
    let length = usize::from(u16::from_be_bytes([src[16], src[17]]));
    if !(HEADER_LEN..=max_message_len).contains(&length) {
        return Err(Error::MessageLength(length, HEADER_LEN, max_message_len));
    }
    if src.len() < length {
        return Ok(None);
    }
    let _marker = src.copy_to_bytes(16);
    let _length = src.get_u16();
    let msg_type = src.get_u8();
    let msg_type = MessageType::from_u8(msg_type).ok_or(Error::MessageType(msg_type))?;
    let body = src.split_to(length - HEADER_LEN).freeze();
    Ok(Some(Frame { msg_type, body }))
}

/// Write a BGP header (marker, a placeholder length, and the message type)
/// into `dst`, returning the offset of the length field to patch in once the
/// body has been encoded.
pub fn write_header(dst: &mut BytesMut, msg_type: MessageType) -> usize {
    dst.put_slice(&MARKER);
    let len_pos = dst.len();
    dst.put_u16(0); // Placeholder, patched by `patch_length`
    dst.put_u8(msg_type as u8);
    len_pos
}

/// Patch the length field reserved by [`write_header`] now that `body_len`
/// bytes have been appended after the header.
///
/// # Panics
/// Panics if `HEADER_LEN + body_len` does not fit in a `u16`, i.e. the body
/// is larger than what the negotiated maximum message length allows for.
pub fn patch_length(dst: &mut BytesMut, len_pos: usize, body_len: usize) {
    let len = u16::try_from(HEADER_LEN + body_len).expect("message length overflow");
    dst[len_pos..len_pos + 2].copy_from_slice(&len.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_to_bytes;

    #[test]
    fn test_try_frame_incomplete_header() {
        let mut src = BytesMut::from(&b"\xff\xff\xff"[..]);
        assert!(try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_try_frame_incomplete_body() {
        let mut src = BytesMut::new();
        src.put_slice(&MARKER);
        src.put_u16(25); // Claims 6 bytes of body, but none follow
        src.put_u8(MessageType::Update as u8);
        assert!(try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_try_frame_bad_marker() {
        let mut src = BytesMut::new();
        src.put_slice(&[0u8; 16]);
        src.put_u16(19);
        src.put_u8(MessageType::Keepalive as u8);
        assert!(matches!(
            try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN),
            Err(Error::Marker)
        ));
    }

    #[test]
    fn test_try_frame_over_max_length() {
        let mut src = BytesMut::new();
        src.put_slice(&MARKER);
        src.put_u16(5000);
        src.put_u8(MessageType::Update as u8);
        assert!(matches!(
            try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN),
            Err(Error::MessageLength(5000, HEADER_LEN, crate::DEFAULT_MAX_MESSAGE_LEN))
        ));
    }

    #[test]
    fn test_try_frame_keepalive() {
        let body = hex_to_bytes("ffffffffffffffffffffffffffffffff 0013 04");
        let mut src = BytesMut::from(&body[..]);
        let frame = try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN)
            .unwrap()
            .unwrap();
        assert_eq!(frame.msg_type, MessageType::Keepalive);
        assert!(frame.body.is_empty());
        assert!(src.is_empty());
    }

    #[test]
    fn test_write_header_round_trip() {
        let mut dst = BytesMut::new();
        let len_pos = write_header(&mut dst, MessageType::Keepalive);
        patch_length(&mut dst, len_pos, 0);
        let mut src = dst;
        let frame = try_frame(&mut src, crate::DEFAULT_MAX_MESSAGE_LEN)
            .unwrap()
            .unwrap();
        assert_eq!(frame.msg_type, MessageType::Keepalive);
        assert!(frame.body.is_empty());
    }
}
