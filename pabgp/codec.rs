//! `tokio_util` codec adapter wrapping the sans-I/O [`crate::framer`].

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::endec::{Component, MessageType};
use crate::framer::{self, Frame};
use crate::message::{Message, Notification, Open, Operational, RouteRefresh, Update};
use crate::{Error, DEFAULT_MAX_MESSAGE_LEN};
use bytes::Buf;
use tokio_util::codec::{Decoder, Encoder};

/// BGP message codec.
///
/// `max_message_len` starts at [`DEFAULT_MAX_MESSAGE_LEN`] and is raised to
/// [`crate::EXTENDED_MAX_MESSAGE_LEN`] by the session driver once Extended
/// Message (RFC 8654) has been negotiated with the peer.
#[derive(Copy, Clone, Debug)]
pub struct Codec {
    pub max_message_len: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl Decoder for Codec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(Frame { msg_type, body }) = framer::try_frame(src, self.max_message_len)? else {
            return Ok(None);
        };
        let mut body = body;
        let message = match msg_type {
            MessageType::Open => Message::Open(Open::from_bytes(&mut body)?),
            MessageType::Update => Message::Update(Update::from_bytes(&mut body)?),
            MessageType::Notification => Message::Notification(Notification::from_bytes(&mut body)?),
            MessageType::Keepalive => Message::Keepalive,
            MessageType::RouteRefresh => Message::RouteRefresh(RouteRefresh::from_bytes(&mut body)?),
            MessageType::Operational => Message::Operational(Operational::from_bytes(&mut body)?),
        };
        if body.has_remaining() {
            log::debug!("Remaining bytes after decoding {msg_type:?}: {body:?}");
            Err(Error::InternalLength(
                "message",
                std::cmp::Ordering::Greater,
            ))
        } else {
            Ok(Some(message))
        }
    }
}

impl Encoder<Message> for Codec {
    // tokio requires the Error type to be `From<io::Error>`, but ours never fails to encode
    type Error = std::io::Error;

    fn encode(&mut self, item: Message, dst: &mut bytes::BytesMut) -> Result<(), Self::Error> {
        let msg_type = match &item {
            Message::Open(_) => MessageType::Open,
            Message::Update(_) => MessageType::Update,
            Message::Notification(_) => MessageType::Notification,
            Message::Keepalive => MessageType::Keepalive,
            Message::RouteRefresh(_) => MessageType::RouteRefresh,
            Message::Operational(_) => MessageType::Operational,
        };
        let len_pos = framer::write_header(dst, msg_type);
        let body_len = match item {
            Message::Open(msg) => msg.to_bytes(dst),
            Message::Update(msg) => msg.to_bytes(dst),
            Message::Notification(msg) => msg.to_bytes(dst),
            Message::Keepalive => 0,
            Message::RouteRefresh(msg) => msg.to_bytes(dst),
            Message::Operational(msg) => msg.to_bytes(dst),
        };
        framer::patch_length(dst, len_pos, body_len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_keepalive_round_trip() {
        let mut codec = Codec::default();
        let mut buf = BytesMut::new();
        codec.encode(Message::Keepalive, &mut buf).unwrap();
        assert_eq!(buf.len(), crate::HEADER_LEN);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Message::Keepalive);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_full_frame() {
        let mut codec = Codec::default();
        let mut buf = BytesMut::new();
        codec.encode(Message::Keepalive, &mut buf).unwrap();
        let mut partial = buf.split_to(buf.len() - 1);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }
}
