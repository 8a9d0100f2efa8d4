//! PABGP -- a BGP-4 peer protocol engine
//!
//! Structs here intend to represent the data instead of the on-wire format.
//! The crate is organized bottom-up: [`endec`] carries the shared
//! [`endec::Component`] (de)serialization trait, [`capability`], [`path`],
//! [`route`] and [`message`] build the typed wire model on top of it,
//! [`framer`] and [`codec`] connect that model to a byte stream, and
//! [`session`] drives one peer's connection end to end.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod api;
pub mod capability;
pub mod cidr;
#[cfg(feature = "tokio-endec")]
pub mod codec;
#[cfg(feature = "tokio-endec")]
pub mod connection;
pub mod endec;
pub mod error;
pub mod framer;
pub mod message;
pub mod negotiate;
pub mod path;
pub mod rib;
pub mod route;
#[cfg(feature = "tokio-endec")]
pub mod session;
mod update_builder;

#[cfg(feature = "tokio-endec")]
pub use codec::Codec;
pub use error::NotifyError;
pub use message::{
    CeaseSubcode, Message, MessageHeaderErrorSubcode, Notification, NotificationErrorCode, Open,
    OpenMessageErrorSubcode, Operational, RouteRefresh, Update, UpdateMessageErrorSubcode,
};
pub use negotiate::Negotiated;
pub use update_builder::UpdateBuilder;

use bytes::BufMut;

/// Supported BGP version
pub const BGP_VERSION: u8 = 4;

/// ASN used on the wire in place of a 4-byte AS number that doesn't fit in 16 bits
pub const AS_TRANS: u16 = 23456;

/// BGP marker
pub const MARKER: [u8; 16] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Default BGP message length limit (RFC 4271), before Extended Message is negotiated
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// Maximum BGP message length once Extended Message (RFC 8654) is negotiated
pub const EXTENDED_MAX_MESSAGE_LEN: usize = 65535;

/// BGP message header length (marker + length + type)
pub const HEADER_LEN: usize = 19;

/// Outbound chunked-PDU backlog bound for one peer (see [`session`])
pub const MAX_BACKLOG: usize = 15_000;

/// BGP packet errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid or missing marker")]
    Marker,
    #[error("invalid message type")]
    MessageType(u8),
    #[error("message length {0} outside allowed range {1}..={2}")]
    MessageLength(usize, usize, usize),
    #[error("invalid internal length at {0} ({1:?})")]
    InternalLength(&'static str, std::cmp::Ordering),
    #[error("invalid {0} type of {1}")]
    InternalType(&'static str, u16),
    #[error("requires MP-BGP capability")]
    NoMpBgp,
    #[error("attempting to update NLRI without next hop")]
    NoNextHop,
    #[error("route-refresh received but not negotiated")]
    RouteRefreshNotNegotiated,
    #[error("session is not in the ready state")]
    NotReady,
}

#[cfg(test)]
const fn convert_one_hex_digit(c: u8) -> u8 {
    if c.is_ascii_digit() {
        c - b'0'
    } else if c.is_ascii_lowercase() {
        c - b'a' + 10
    } else if c.is_ascii_uppercase() {
        c - b'A' + 10
    } else {
        panic!("invalid hex character");
    }
}

#[cfg(test)]
#[must_use]
pub(crate) fn hex_to_bytes(hex: &str) -> bytes::Bytes {
    // Skip these characters on octet boundary
    const SKIP: &[u8] = b" \t\n\r:.";
    let hex = hex.as_bytes();
    let mut octets = bytes::BytesMut::with_capacity(hex.len() / 2);
    let mut i = 0;
    while i < hex.len() {
        let c = hex[i];
        if SKIP.contains(&c) {
            i += 1;
            continue;
        }
        let hi = convert_one_hex_digit(c) << 4;
        assert!(i + 1 < hex.len(), "odd number of hex digits");
        let lo = convert_one_hex_digit(hex[i + 1]);
        octets.put_u8(hi | lo);
        i += 2;
    }
    octets.freeze()
}
