//! Capability negotiation: build an outgoing OPEN's capabilities from
//! neighbor configuration, then derive the session-wide [`Negotiated`]
//! parameters once both sides' OPEN messages have been seen.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::{
    Afi, AddPathValue, Capabilities, CapabilitiesBuilder, GracefulRestart, Safi,
};
use crate::message::{NotificationErrorCode, OpenMessageErrorSubcode};
use crate::{NotifyError, Open};
use std::net::Ipv4Addr;

/// Local configuration for one neighbor, used both to build the outgoing
/// OPEN and to validate the peer's.
#[derive(Clone, Debug)]
pub struct NeighborConfig {
    pub local_asn: u32,
    pub remote_asn: u32,
    pub router_id: Ipv4Addr,
    pub hold_time: u16,
    pub families: Vec<(Afi, Safi)>,
    pub add_path: Vec<AddPathValue>,
    pub route_refresh: bool,
    pub enhanced_route_refresh: bool,
    pub extended_message: bool,
    pub aigp: bool,
    pub graceful_restart: Option<GracefulRestart>,
    /// Allow a peer's router-id to collide with ours (route-reflector clients
    /// commonly share one).
    pub allow_reflector: bool,
}

impl NeighborConfig {
    /// Build the `Capabilities` to advertise in the outgoing OPEN.
    ///
    /// `restarted` is set when this OPEN is sent as part of a graceful-restart
    /// reconnect, and is folded into the advertised `GracefulRestart`'s R-bit.
    #[must_use]
    pub fn build_capabilities(&self, restarted: bool) -> Capabilities {
        let mut builder = CapabilitiesBuilder::default().four_octet_as_number_if_needed(self.local_asn);
        for &(afi, safi) in &self.families {
            builder = builder.multi_protocol(afi, safi);
        }
        if self.route_refresh {
            builder = builder.route_refresh();
        }
        if self.enhanced_route_refresh {
            builder = builder.enhanced_route_refresh();
        }
        if self.extended_message {
            builder = builder.extended_message();
        }
        if self.aigp {
            builder = builder.aigp();
        }
        if let Some(gr) = &self.graceful_restart {
            let mut gr = gr.clone();
            gr.restarted = restarted;
            builder = builder.graceful_restart(gr);
        }
        for ap in &self.add_path {
            builder = builder.add_path(ap.afi, ap.safi, ap.send, ap.receive);
        }
        builder.build()
    }
}

/// The derived session parameters once both sides' OPEN messages have been
/// exchanged and validated. Only [`State::Ready`] permits encoding/decoding
/// of UPDATE, REFRESH and OPERATIONAL messages on a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Empty,
    Sent,
    Received,
    Validated,
    Ready,
}

/// Derived session parameters, field-by-field combines of local and peer
/// capabilities: families are the intersection of both sides' Multiprotocol
/// sets, add-path directions are the bitwise compatibility of both sides'
/// advertisements, and the rest are boolean conjunctions.
#[derive(Clone, Debug)]
pub struct Negotiated {
    pub state: State,
    pub hold_time: u16,
    pub asn4: bool,
    pub families: Vec<(Afi, Safi)>,
    pub add_path: Vec<AddPathValue>,
    pub route_refresh: bool,
    pub enhanced_route_refresh: bool,
    pub extended_message: bool,
    pub operational: bool,
    pub graceful_restart_restarted: bool,
}

impl Negotiated {
    /// An empty set of parameters, before any OPEN has been sent or received.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            state: State::Empty,
            hold_time: 0,
            asn4: false,
            families: Vec::new(),
            add_path: Vec::new(),
            route_refresh: false,
            enhanced_route_refresh: false,
            extended_message: false,
            operational: false,
            graceful_restart_restarted: false,
        }
    }

    /// Mark that the local OPEN has been sent.
    pub fn mark_sent(&mut self) {
        if self.state == State::Empty {
            self.state = State::Sent;
        }
    }

    /// Validate the peer's OPEN against `config`, raising the RFC 4271 §6.2
    /// Notification on the first violation found.
    ///
    /// Does not yet derive the intersected parameters: call [`Self::validate`]
    /// followed by [`Self::finish`] (or just [`Self::negotiate`], which does
    /// both) once the peer's capabilities are also at hand.
    pub fn validate(config: &NeighborConfig, peer_open: &Open) -> Result<(), NotifyError> {
        if peer_open.version != crate::BGP_VERSION {
            return Err(NotifyError::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::UnsupportedVersionNumber as u8,
            ));
        }
        let peer_asn = peer_asn(peer_open, &peer_capabilities(peer_open));
        if peer_asn != config.remote_asn {
            return Err(NotifyError::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::BadPeerAs as u8,
            ));
        }
        if peer_open.hold_time != 0 && peer_open.hold_time < 3 {
            return Err(NotifyError::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::UnacceptableHoldTime as u8,
            ));
        }
        if peer_open.bgp_id.is_unspecified()
            || (peer_open.bgp_id == config.router_id && !config.allow_reflector)
        {
            return Err(NotifyError::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::BadBgpIdentifier as u8,
            ));
        }
        Ok(())
    }

    /// Derive the intersected session parameters from a validated peer OPEN.
    #[must_use]
    pub fn finish(config: &NeighborConfig, local_caps: &Capabilities, peer_open: &Open) -> Self {
        let peer_caps = peer_capabilities(peer_open);

        let local_families = &config.families;
        let families: Vec<(Afi, Safi)> = local_families
            .iter()
            .copied()
            .filter(|&(afi, safi)| {
                peer_caps.has(&crate::capability::Value::MultiProtocol(
                    crate::capability::MultiProtocol { afi, safi },
                ))
            })
            .collect();

        let local_add_path = config.add_path.clone();
        let peer_add_path = peer_caps.add_path_families();
        let add_path: Vec<AddPathValue> = local_add_path
            .iter()
            .filter_map(|local| {
                peer_add_path
                    .iter()
                    .find(|peer| peer.afi == local.afi && peer.safi == local.safi)
                    .map(|peer| AddPathValue::negotiate(local, peer))
            })
            .filter(|ap| ap.send || ap.receive)
            .collect();

        let graceful_restart_restarted = peer_caps
            .graceful_restart()
            .is_some_and(|gr| gr.restarted)
            && config.graceful_restart.is_some();

        Self {
            state: State::Validated,
            hold_time: config.hold_time.min(peer_open.hold_time),
            asn4: local_caps.iter().any(|v| matches!(v, crate::capability::Value::FourOctetAsNumber(_)))
                && peer_caps
                    .iter()
                    .any(|v| matches!(v, crate::capability::Value::FourOctetAsNumber(_))),
            families,
            add_path,
            route_refresh: config.route_refresh && peer_caps.has_route_refresh(),
            enhanced_route_refresh: config.enhanced_route_refresh
                && peer_caps.has_enhanced_route_refresh(),
            extended_message: config.extended_message && peer_caps.has_extended_message(),
            operational: true,
            graceful_restart_restarted,
        }
    }

    /// Validate and derive in one step, then mark the result `Ready`.
    pub fn negotiate(
        config: &NeighborConfig,
        local_caps: &Capabilities,
        peer_open: &Open,
    ) -> Result<Self, NotifyError> {
        Self::validate(config, peer_open)?;
        let mut negotiated = Self::finish(config, local_caps, peer_open);
        negotiated.state = State::Ready;
        Ok(negotiated)
    }

    /// Whether UPDATE/REFRESH/OPERATIONAL may be encoded or decoded yet.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready)
    }

    /// The maximum message length this session may now use on the wire.
    #[must_use]
    pub const fn max_message_len(&self) -> usize {
        if self.extended_message {
            crate::EXTENDED_MAX_MESSAGE_LEN
        } else {
            crate::DEFAULT_MAX_MESSAGE_LEN
        }
    }
}

impl Default for Negotiated {
    fn default() -> Self {
        Self::empty()
    }
}

/// The peer's capabilities, as advertised in its OPEN's optional parameters.
fn peer_capabilities(open: &Open) -> Capabilities {
    open.opt_params
        .iter()
        .find_map(|p| match p {
            crate::capability::OptionalParameterValue::Capabilities(c) => Some(c.clone()),
        })
        .unwrap_or_default()
}

/// The peer's real AS number. When the peer advertised a Four-Octet AS
/// Number capability, that value is authoritative -- the 16-bit OPEN field
/// is then just `AS_TRANS` for a 4-byte AS that doesn't fit in it. Only
/// fall back to the OPEN field itself when no such capability was sent.
fn peer_asn(open: &Open, peer_caps: &Capabilities) -> u32 {
    peer_caps
        .iter()
        .find_map(|v| match v {
            crate::capability::Value::FourOctetAsNumber(four) => Some(four.asn),
            _ => None,
        })
        .unwrap_or_else(|| u32::from(open.asn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Afi, Safi};
    use std::net::Ipv4Addr;

    fn config() -> NeighborConfig {
        NeighborConfig {
            local_asn: 65000,
            remote_asn: 65001,
            router_id: Ipv4Addr::new(192, 0, 2, 1),
            hold_time: 90,
            families: vec![(Afi::Ipv4, Safi::Unicast)],
            add_path: vec![AddPathValue {
                afi: Afi::Ipv4,
                safi: Safi::Unicast,
                send: true,
                receive: true,
            }],
            route_refresh: true,
            enhanced_route_refresh: false,
            extended_message: false,
            aigp: false,
            graceful_restart: None,
            allow_reflector: false,
        }
    }

    fn peer_open_with(caps: Capabilities, hold_time: u16, asn: u16, bgp_id: Ipv4Addr) -> Open {
        Open::new_easy(u32::from(asn), hold_time, bgp_id, caps)
    }

    #[test]
    fn test_validate_rejects_wrong_asn() {
        let cfg = config();
        let caps = cfg.build_capabilities(false);
        let open = peer_open_with(caps, 90, 65002, Ipv4Addr::new(192, 0, 2, 2));
        let err = Negotiated::validate(&cfg, &open).unwrap_err();
        assert_eq!(err.code, NotificationErrorCode::OpenMessageError);
        assert_eq!(err.subcode, OpenMessageErrorSubcode::BadPeerAs as u8);
    }

    #[test]
    fn test_validate_rejects_router_id_collision() {
        let cfg = config();
        let caps = cfg.build_capabilities(false);
        let open = peer_open_with(caps, 90, 65001, cfg.router_id);
        let err = Negotiated::validate(&cfg, &open).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::BadBgpIdentifier as u8);
    }

    #[test]
    fn test_validate_rejects_short_hold_time() {
        let cfg = config();
        let caps = cfg.build_capabilities(false);
        let open = peer_open_with(caps, 2, 65001, Ipv4Addr::new(192, 0, 2, 2));
        let err = Negotiated::validate(&cfg, &open).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::UnacceptableHoldTime as u8);
    }

    #[test]
    fn test_negotiate_intersects_families_and_add_path() {
        let cfg = config();
        let local_caps = cfg.build_capabilities(false);
        let mut peer_cfg = cfg.clone();
        peer_cfg.remote_asn = cfg.local_asn;
        peer_cfg.router_id = Ipv4Addr::new(192, 0, 2, 2);
        let peer_caps = peer_cfg.build_capabilities(false);
        let peer_open = peer_open_with(peer_caps, 30, 65001, Ipv4Addr::new(192, 0, 2, 2));

        let negotiated = Negotiated::negotiate(&cfg, &local_caps, &peer_open).unwrap();
        assert!(negotiated.is_ready());
        assert_eq!(negotiated.hold_time, 30);
        assert_eq!(negotiated.families, vec![(Afi::Ipv4, Safi::Unicast)]);
        assert_eq!(negotiated.add_path.len(), 1);
        assert!(negotiated.add_path[0].send);
        assert!(negotiated.add_path[0].receive);
        assert!(negotiated.route_refresh);
    }

    #[test]
    fn test_negotiate_is_idempotent_and_commutative() {
        let cfg = config();
        let caps = cfg.build_capabilities(false);
        let open = peer_open_with(caps.clone(), 90, 65001, Ipv4Addr::new(192, 0, 2, 2));
        let mut peer_cfg = cfg.clone();
        peer_cfg.remote_asn = cfg.local_asn;
        peer_cfg.router_id = Ipv4Addr::new(192, 0, 2, 2);

        let a = Negotiated::negotiate(&cfg, &caps, &open).unwrap();
        let b = Negotiated::negotiate(&cfg, &caps, &open).unwrap();
        assert_eq!(a.families, b.families);
        assert_eq!(a.add_path, b.add_path);
    }
}
