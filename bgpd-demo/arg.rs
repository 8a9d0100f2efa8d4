//! Command line arguments parsing.

// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::Parser;
use pabgp::cidr::Cidr;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Parser, Debug)]
pub struct BgpdDemo {
    /// Our AS number (supports 4-byte AS number)
    pub local_as: u32,
    /// Our BGP router ID
    pub local_id: Ipv4Addr,
    /// Expected peer AS number
    pub peer_as: u32,
    /// Next hop advertised for our routes
    ///
    /// If both IPv4 and IPv6 routes are advertised, the peer is required to
    /// support MP-BGP and Extended Next Hop.
    ///
    /// Defaults to the local ID if not specified.
    #[arg(short = 'n', long)]
    pub next_hop: Option<IpAddr>,
    /// BGP session listen address
    #[arg(short = 'l', long, default_value = "::")]
    pub listen_addr: IpAddr,
    /// BGP session listen port
    ///
    /// Also overridable through the `exabgp.tcp.port` / `exabgp_tcp_port`
    /// environment variables, checked in that order.
    #[arg(short = 'p', long, default_value = "179")]
    pub listen_port: u16,
    /// Routes to advertise once the session is established
    pub routes: Vec<Cidr>,
    /// Enable MP-BGP multiprotocol capability negotiation
    #[arg(short = 'm', long)]
    pub enable_mp_bgp: bool,
    /// TCP-MD5 signature key shared with the peer (RFC 2385, Linux only)
    #[arg(long)]
    pub md5_key: Option<String>,
    /// Enable the Generalized TTL Security Mechanism (RFC 5082)
    #[arg(long)]
    pub gtsm: bool,
    /// Verbose mode
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
