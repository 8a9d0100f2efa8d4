//! Notification-shaped errors: the session boundary's single fallible
//! conversion target for decode errors, I/O failures and locally-detected
//! protocol violations (RFC 4271 §6).

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::message::{
    CeaseSubcode, MessageHeaderErrorSubcode, Notification, NotificationErrorCode,
    UpdateMessageErrorSubcode,
};
use bytes::Bytes;

/// A BGP error mapped onto the Notification (code, subcode) space.
///
/// Every [`crate::Error`] produced while decoding a PDU, and every
/// locally-detected FSM or session violation, converts into one of these via
/// [`From`]. Failures with no sane Notification mapping (a socket that was
/// never established, for instance) stay as the lower-level error and are
/// never forced through this conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("BGP notification {code:?}/{subcode}")]
pub struct NotifyError {
    pub code: NotificationErrorCode,
    pub subcode: u8,
}

impl NotifyError {
    #[must_use]
    pub const fn new(code: NotificationErrorCode, subcode: u8) -> Self {
        Self { code, subcode }
    }

    /// Render as a wire-ready NOTIFICATION message carrying no extra data.
    #[must_use]
    pub fn to_notification(self) -> Notification {
        Notification::new(self.code, self.subcode, Bytes::new())
    }

    #[must_use]
    pub const fn hold_timer_expired() -> Self {
        Self::new(NotificationErrorCode::HoldTimerExpired, 0)
    }

    #[must_use]
    pub const fn fsm_error(subcode: u8) -> Self {
        Self::new(NotificationErrorCode::FiniteStateMachineError, subcode)
    }

    #[must_use]
    pub const fn cease(subcode: CeaseSubcode) -> Self {
        Self::new(NotificationErrorCode::Cease, subcode as u8)
    }
}

/// Map a codec-level decode/I/O failure onto the Notification space.
///
/// This is the taxonomy fixed by RFC 4271 §6: unrecognized well-known
/// attributes, malformed AS_PATH, bad NEXT_HOP and truncated/over-long NLRI
/// each get their own subcode; anything else that made it past framing but
/// failed to parse is a generic malformed attribute list.
impl From<crate::Error> for NotifyError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Marker => Self::new(
                NotificationErrorCode::MessageHeaderError,
                MessageHeaderErrorSubcode::ConnectionNotSynchronized as u8,
            ),
            crate::Error::MessageLength(..) => Self::new(
                NotificationErrorCode::MessageHeaderError,
                MessageHeaderErrorSubcode::BadMessageLength as u8,
            ),
            crate::Error::MessageType(_) => Self::new(
                NotificationErrorCode::MessageHeaderError,
                MessageHeaderErrorSubcode::BadMessageType as u8,
            ),
            crate::Error::NoNextHop => Self::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::InvalidNextHopAttribute as u8,
            ),
            // Reuses MessageHeaderError/BadMessageType: RFC 2918 has no
            // dedicated "capability not negotiated" code.
            crate::Error::RouteRefreshNotNegotiated => Self::new(
                NotificationErrorCode::MessageHeaderError,
                MessageHeaderErrorSubcode::BadMessageType as u8,
            ),
            crate::Error::InternalLength(field, _) if field == "prefix" => Self::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::InvalidNetworkField as u8,
            ),
            crate::Error::InternalType(field, _) | crate::Error::InternalLength(field, _)
                if field.contains("AS segment") || field.contains("AS_PATH") =>
            {
                Self::new(
                    NotificationErrorCode::UpdateMessageError,
                    UpdateMessageErrorSubcode::MalformedAsPath as u8,
                )
            }
            crate::Error::InternalLength(..) | crate::Error::InternalType(..) => Self::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::MalformedAttributeList as u8,
            ),
            crate::Error::NoMpBgp | crate::Error::NotReady | crate::Error::Io(_) => {
                Self::new(NotificationErrorCode::Cease, CeaseSubcode::AdministrativeReset as u8)
            }
        }
    }
}
