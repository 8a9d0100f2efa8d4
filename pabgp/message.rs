//! BGP message types: OPEN, UPDATE, NOTIFICATION, KEEPALIVE, ROUTE-REFRESH, OPERATIONAL.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::{self, Capabilities, OptionalParameters};
use crate::endec::Component;
use crate::path::PathAttributes;
use crate::route::Routes;
use crate::{Error, AS_TRANS, BGP_VERSION};
use bytes::{Buf, BufMut, Bytes};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::net::Ipv4Addr;

/// BGP message
///
/// `Message` only carries PDUs that made it across the wire. The "no
/// progress this tick" sentinel described for the session driver has no
/// representation here: it's the suspension of the `.await` point on the
/// inbound stream, a property of a step rather than of a message.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Open(Open),
    Update(Update),
    Notification(Notification),
    Keepalive,
    RouteRefresh(RouteRefresh),
    Operational(Operational),
}

/// BGP open message
#[derive(Clone, Debug, PartialEq)]
pub struct Open {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub bgp_id: Ipv4Addr,
    pub opt_params: OptionalParameters,
}

impl Component for Open {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, Error> {
        let version = src.get_u8();
        let asn = src.get_u16();
        let hold_time = src.get_u16();
        let bgp_id = Ipv4Addr::from(src.get_u32());
        let opt_params = OptionalParameters::from_bytes(src)?;
        Ok(Self {
            version,
            asn,
            hold_time,
            bgp_id,
            opt_params,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        len += self.version.to_bytes(dst);
        len += self.asn.to_bytes(dst);
        len += self.hold_time.to_bytes(dst);
        len += self.bgp_id.to_bytes(dst);
        len += self.opt_params.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        1 + 2 + 2 + 4 + self.opt_params.encoded_len()
    }
}

impl Open {
    /// Create a new BGP open message
    #[must_use]
    pub fn new_easy(asn: u32, hold_time: u16, bgp_id: Ipv4Addr, capabilities: Capabilities) -> Self {
        let oldbgp_asn = u16::try_from(asn).unwrap_or(AS_TRANS);
        Self {
            version: BGP_VERSION,
            asn: oldbgp_asn,
            hold_time,
            bgp_id,
            opt_params: vec![capability::OptionalParameterValue::Capabilities(
                capabilities,
            )]
            .into(),
        }
    }
}

/// BGP update message
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub withdrawn_routes: Routes,
    pub path_attributes: PathAttributes,
    pub nlri: Routes,
}

impl Component for Update {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, Error> {
        let withdrawn_len = src.get_u16() as usize;
        let mut wdr_buf = src.split_to(withdrawn_len);
        let withdrawn_routes = Routes::from_bytes(&mut wdr_buf)?;
        let tpa_len = src.get_u16() as usize;
        let mut tpa_buf = src.split_to(tpa_len);
        let path_attributes = PathAttributes::from_bytes(&mut tpa_buf)?;
        let nlri = Routes::from_bytes(src)?;
        Ok(Self {
            withdrawn_routes,
            path_attributes,
            nlri,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        let wdr_len_pos = dst.len();
        len += 0u16.to_bytes(dst); // Placeholder for withdrawn routes length
        let wdr_len = self.withdrawn_routes.to_bytes(dst);
        len += wdr_len;
        dst[wdr_len_pos..wdr_len_pos + 2].copy_from_slice(
            &(u16::try_from(wdr_len)
                .expect("withdrawn routes length overflow")
                .to_be_bytes()),
        );
        let tpa_len_pos = dst.len();
        len += 0u16.to_bytes(dst); // Placeholder for total path attributes length
        let tpa_len = self.path_attributes.to_bytes(dst);
        len += tpa_len;
        dst[tpa_len_pos..tpa_len_pos + 2].copy_from_slice(
            &(u16::try_from(tpa_len)
                .expect("total path attributes length overflow")
                .to_be_bytes()),
        );
        len += self.nlri.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        2 + self.withdrawn_routes.encoded_len()
            + 2
            + self.path_attributes.encoded_len()
            + self.nlri.encoded_len()
    }
}

impl Update {
    /// An UPDATE with nothing withdrawn, no attributes and no NLRI is the
    /// legacy (pre-MP-BGP) End-of-RIB marker for IPv4 unicast.
    #[must_use]
    pub fn is_legacy_eor(&self) -> bool {
        self.withdrawn_routes.is_empty() && self.path_attributes.is_empty() && self.nlri.is_empty()
    }

    /// The legacy IPv4-unicast End-of-RIB marker.
    #[must_use]
    pub fn legacy_eor() -> Self {
        Self {
            withdrawn_routes: Routes::default(),
            path_attributes: PathAttributes::default(),
            nlri: Routes::default(),
        }
    }
}

/// BGP route-refresh message (RFC 2918), optionally carrying the Enhanced
/// Route-Refresh (RFC 7313) begin/end demarcation in the reserved octet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RouteRefresh {
    pub afi: capability::Afi,
    pub safi: capability::Safi,
    /// Enhanced Route-Refresh demarcation: `None` when not negotiated, otherwise
    /// `Some(true)` for "begin of route refresh" and `Some(false)` for "end".
    pub demarcation: Option<bool>,
}

impl Component for RouteRefresh {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, Error> {
        let afi = src.get_u16();
        let afi = capability::Afi::try_from(afi)
            .map_err(|_| Error::InternalType("RouteRefresh AFI", afi))?;
        let reserved = src.get_u8();
        let demarcation = match reserved {
            0 => None,
            1 => Some(true),
            2 => Some(false),
            other => return Err(Error::InternalType("RouteRefresh demarcation", u16::from(other))),
        };
        let safi = src.get_u8().into();
        let safi = capability::Safi::try_from(safi)
            .map_err(|_| Error::InternalType("RouteRefresh SAFI", safi))?;
        Ok(Self {
            afi,
            safi,
            demarcation,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u16(self.afi as u16);
        let reserved = match self.demarcation {
            None => 0,
            Some(true) => 1,
            Some(false) => 2,
        };
        dst.put_u8(reserved);
        dst.put_u8(self.safi as u8);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        4
    }
}

/// BGP operational message: a 2-octet subtype followed by a subtype-specific
/// opaque payload. No subtype semantics are interpreted here; callers that
/// care about a particular subtype decode `payload` themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operational {
    pub subtype: u16,
    pub payload: Bytes,
}

impl Component for Operational {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, Error> {
        let subtype = src.get_u16();
        let payload = src.copy_to_bytes(src.remaining());
        Ok(Self { subtype, payload })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u16(self.subtype);
        dst.put_slice(&self.payload);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        2 + self.payload.len()
    }
}

/// BGP notification message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub error_code: NotificationErrorCode,
    pub error_subcode: u8,
    pub data: Bytes,
}

impl Component for Notification {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, Error> {
        let error_code = src.get_u8();
        let error_subcode = src.get_u8();
        let data = src.copy_to_bytes(src.remaining());
        Ok(Self {
            error_code: NotificationErrorCode::from_u8(error_code)
                .ok_or_else(|| Error::InternalType("error_code", u16::from(error_code)))?,
            error_subcode,
            data,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        (self.error_code as u8).to_bytes(dst);
        self.error_subcode.to_bytes(dst);
        dst.put_slice(&self.data);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }
}

impl Notification {
    /// Create a new BGP notification message
    pub const fn new(error_code: NotificationErrorCode, error_subcode: u8, data: Bytes) -> Self {
        Self {
            error_code,
            error_subcode,
            data,
        }
    }
}

/// Notification error codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum NotificationErrorCode {
    MessageHeaderError = 1,
    OpenMessageError = 2,
    UpdateMessageError = 3,
    HoldTimerExpired = 4,
    FiniteStateMachineError = 5,
    Cease = 6,
}

/// Notification error subcodes for `MessageHeaderError`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum MessageHeaderErrorSubcode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

/// Notification error subcodes for `OpenMessageError`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum OpenMessageErrorSubcode {
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    UnacceptableHoldTime = 6,
}

/// Notification error subcodes for `UpdateMessageError`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum UpdateMessageErrorSubcode {
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidOriginAttribute = 6,
    AsRoutingLoop = 7,
    InvalidNextHopAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedAsPath = 11,
}

/// Notification error subcodes for Cease
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum CeaseSubcode {
    MaximumNumberOfPrefixesReached = 1,
    AdministrativeShutdown = 2,
    PeerDeconfigured = 3,
    AdministrativeReset = 4,
    ConnectionRejected = 5,
    OtherConfigurationChange = 6,
    ConnectionCollisionResolution = 7,
    OutOfResources = 8,
}
