//! The API sink: the process-manager-facing collaborator the session driver
//! publishes observable events to. Filtering is per-direction and per
//! message-code, controlled by [`ApiFlags`], so a quiet session only pays
//! for the events someone actually asked for.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::message::{Message, Notification, RouteRefresh};

/// Which side of the wire an event travelled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// Per-message-type enable bits, one set for each [`Direction`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageTypeFlags {
    pub open: bool,
    pub update: bool,
    pub notification: bool,
    pub keepalive: bool,
    pub route_refresh: bool,
    pub operational: bool,
}

impl MessageTypeFlags {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            open: true,
            update: true,
            notification: true,
            keepalive: true,
            route_refresh: true,
            operational: true,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            open: false,
            update: false,
            notification: false,
            keepalive: false,
            route_refresh: false,
            operational: false,
        }
    }

    #[must_use]
    pub const fn wants(&self, message: &Message) -> bool {
        match message {
            Message::Open(_) => self.open,
            Message::Update(_) => self.update,
            Message::Notification(_) => self.notification,
            Message::Keepalive => self.keepalive,
            Message::RouteRefresh(_) => self.route_refresh,
            Message::Operational(_) => self.operational,
        }
    }
}

/// Per-neighbor flags controlling which callbacks the driver invokes. See
/// the Session Driver's inbound-events rule: an UPDATE is only decoded (as
/// opposed to kept as the opaque sentinel) when `parsed` is set or
/// `receive.update` is set.
#[derive(Clone, Debug, Default)]
pub struct ApiFlags {
    /// Emit raw packet (header+body) events.
    pub packets: bool,
    /// Emit decoded/parsed message events.
    pub parsed: bool,
    /// Merge header+body into one callback invocation instead of two.
    pub consolidate: bool,
    pub receive: MessageTypeFlags,
    pub send: MessageTypeFlags,
}

impl ApiFlags {
    /// Whether an inbound UPDATE needs to be fully decoded this tick, or can
    /// stay as the opaque sentinel to save the decode cost.
    #[must_use]
    pub const fn wants_parsed_update(&self) -> bool {
        self.parsed || self.receive.update
    }

    #[must_use]
    pub fn per_direction(&self, direction: Direction) -> &MessageTypeFlags {
        match direction {
            Direction::Send => &self.send,
            Direction::Receive => &self.receive,
        }
    }
}

/// Named callbacks a process-manager collaborator implements to observe one
/// peer's session. Every method has a no-op default so an embedder only
/// overrides what it cares about; a failure to post (e.g. the process
/// manager has gone away) must be swallowed by the implementation, not
/// propagated -- the spec requires that API delivery failures never abort a
/// session.
#[allow(unused_variables)]
pub trait ApiSink {
    fn connected(&mut self) {}

    fn down(&mut self, reason: &str) {}

    fn notification(&mut self, notification: &Notification, header: &[u8], body: &[u8]) {}

    fn packets(&mut self, direction: Direction, message_type: u8, header: &[u8], body: &[u8]) {}

    fn message(&mut self, direction: Direction, parsed: &Message, header: &[u8], body: &[u8]) {}

    fn refresh(&mut self, refresh: &RouteRefresh, header: &[u8], body: &[u8]) {}
}

/// An [`ApiSink`] that drops every event. Used where a caller wants the
/// driver's bookkeeping (hold timer, EOR, pump) without wiring a real
/// process-manager collaborator.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl ApiSink for NullSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_flags_wants_matches_variant() {
        let flags = MessageTypeFlags {
            update: true,
            ..MessageTypeFlags::none()
        };
        assert!(flags.wants(&Message::Update(crate::message::Update {
            withdrawn_routes: crate::route::Routes::default(),
            path_attributes: crate::path::PathAttributes::default(),
            nlri: crate::route::Routes::default(),
        })));
        assert!(!flags.wants(&Message::Keepalive));
    }

    #[test]
    fn test_wants_parsed_update_honors_either_flag() {
        let mut flags = ApiFlags::default();
        assert!(!flags.wants_parsed_update());
        flags.parsed = true;
        assert!(flags.wants_parsed_update());
        flags.parsed = false;
        flags.receive.update = true;
        assert!(flags.wants_parsed_update());
    }
}
