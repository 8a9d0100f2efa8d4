//! The RIB interface consumed by the outbound UPDATE pump.
//!
//! Route storage and best-path selection are out of scope for this engine
//! (see the Non-goals): these are plain traits describing a lazy, read-only
//! producer of outbound UPDATEs, plus a minimal adapter for callers that
//! already have their updates built (the common case for a static feed or a
//! RIB living in a separate crate).

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::message::Update;
use crate::negotiate::Negotiated;

/// One batch of routes queued for announcement, turned into wire-ready
/// UPDATE messages once the session's negotiated parameters are known (the
/// same batch may need MP_REACH_NLRI for one peer and plain NLRI for
/// another).
pub trait UpdateGroup {
    /// The lazy sequence of UPDATE messages this group encodes to.
    type Messages: Iterator<Item = Update>;

    /// Render this group against `negotiated`, consuming it.
    fn messages(self, negotiated: &Negotiated) -> Self::Messages;
}

/// A read-only, lazily-evaluated source of outbound UPDATEs for one peer.
///
/// The session driver's outbound pump calls [`Self::updates`] once per pass
/// and iterates the result until the backlog bound
/// ([`crate::MAX_BACKLOG`]) is reached or the RIB reports empty; it holds no
/// lock across a suspension point.
pub trait OutgoingUpdates {
    type Group: UpdateGroup;
    type Groups: Iterator<Item = Self::Group>;

    /// `group_updates` mirrors the RIB's own grouping knob: when `true`,
    /// routes that share attributes are coalesced into one [`UpdateGroup`]
    /// before chunking: when `false`, each route is its own group.
    fn updates(&mut self, group_updates: bool) -> Self::Groups;
}

/// A trivial [`OutgoingUpdates`] adapter around updates already built (e.g.
/// by [`crate::UpdateBuilder`]). Not a storage engine: it owns no index and
/// performs no selection, it only replays a fixed `Vec` once per
/// [`Self::updates`] call.
#[derive(Clone, Debug, Default)]
pub struct StaticRib {
    pending: Vec<Update>,
}

impl StaticRib {
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Queue pre-built UPDATE messages for the next [`OutgoingUpdates::updates`] pass.
    pub fn enqueue<I: IntoIterator<Item = Update>>(&mut self, updates: I) {
        self.pending.extend(updates);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A single already-rendered [`Update`], playing the role of [`UpdateGroup`]
/// for [`StaticRib`] (one route batch per group, `negotiated` unused since
/// the messages are already wire-ready).
#[derive(Clone, Debug)]
pub struct StaticUpdateGroup(pub Update);

impl UpdateGroup for StaticUpdateGroup {
    type Messages = std::iter::Once<Update>;

    fn messages(self, _negotiated: &Negotiated) -> Self::Messages {
        std::iter::once(self.0)
    }
}

impl OutgoingUpdates for StaticRib {
    type Group = StaticUpdateGroup;
    type Groups = std::vec::IntoIter<StaticUpdateGroup>;

    fn updates(&mut self, _group_updates: bool) -> Self::Groups {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(StaticUpdateGroup)
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_rib_replays_once() {
        let mut rib = StaticRib::new();
        rib.enqueue(vec![Update::legacy_eor()]);
        assert!(!rib.is_empty());
        let negotiated = Negotiated::empty();
        let groups: Vec<_> = rib.updates(false).collect();
        assert_eq!(groups.len(), 1);
        let messages: Vec<_> = groups.into_iter().flat_map(|g| g.messages(&negotiated)).collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_legacy_eor());
        // Draining empties the RIB until more is enqueued.
        assert!(rib.is_empty());
        assert_eq!(rib.updates(false).count(), 0);
    }
}
