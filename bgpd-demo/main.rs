mod arg;

use clap::Parser;
use pabgp::api::{ApiFlags, ApiSink, Direction};
use pabgp::capability::{Afi, Safi};
use pabgp::cidr::Cidr;
use pabgp::connection::{self, ConnectionOptions};
use pabgp::negotiate::NeighborConfig;
use pabgp::path::{AsSegmentType, MpNextHop, Origin};
use pabgp::rib::StaticRib;
use pabgp::route::Routes;
use pabgp::session::{self, Session};
use pabgp::{Message, Notification, NotifyError, UpdateBuilder};
use std::future::pending;
use std::time::Duration;
use tokio::net::TcpStream;

fn setup_logger(level: log::LevelFilter) {
    let config = simplelog::ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("failed to initialize logger");
}

/// An [`ApiSink`] that logs every observable event to the configured logger,
/// standing in for a real process-manager connection.
struct StdoutSink {
    peer: std::net::SocketAddr,
}

impl ApiSink for StdoutSink {
    fn connected(&mut self) {
        log::info!("{}: session established", self.peer);
    }

    fn down(&mut self, reason: &str) {
        log::info!("{}: session down: {reason}", self.peer);
    }

    fn notification(&mut self, notification: &Notification, _header: &[u8], _body: &[u8]) {
        log::warn!(
            "{}: notification {:?}/{}",
            self.peer,
            notification.error_code,
            notification.error_subcode
        );
    }

    fn message(&mut self, direction: Direction, parsed: &Message, _header: &[u8], _body: &[u8]) {
        log::debug!("{}: {direction:?} {parsed:?}", self.peer);
    }
}

fn build_routes(cidrs: &[Cidr]) -> (Routes, Routes) {
    let mut ipv4 = Vec::new();
    let mut ipv6 = Vec::new();
    for &cidr in cidrs {
        match cidr {
            Cidr::V4(cidr) => ipv4.push(cidr.into()),
            Cidr::V6(cidr) => ipv6.push(cidr.into()),
        }
    }
    (Routes(ipv4), Routes(ipv6))
}

fn build_rib(args: &arg::BgpdDemo) -> Result<StaticRib, pabgp::Error> {
    let (ipv4_routes, ipv6_routes) = build_routes(&args.routes);
    let next_hop = args.next_hop.unwrap_or(std::net::IpAddr::V4(args.local_id));
    let updates = UpdateBuilder::new(args.enable_mp_bgp)
        .set_origin(Origin::Igp)
        .set_as_path(AsSegmentType::AsSequence, vec![args.local_as])
        .set_next_hop(MpNextHop::Single(next_hop))
        .add_ipv4_routes(ipv4_routes)
        .add_ipv6_routes(ipv6_routes)
        .build()?;
    let mut rib = StaticRib::new();
    rib.enqueue(updates);
    Ok(rib)
}

fn neighbor_config(args: &arg::BgpdDemo) -> NeighborConfig {
    let mut families = Vec::new();
    if args.enable_mp_bgp {
        families.push((Afi::Ipv4, Safi::Unicast));
        families.push((Afi::Ipv6, Safi::Unicast));
    }
    NeighborConfig {
        local_asn: args.local_as,
        remote_asn: args.peer_as,
        router_id: args.local_id,
        hold_time: 180,
        families,
        add_path: Vec::new(),
        route_refresh: true,
        enhanced_route_refresh: false,
        extended_message: false,
        aigp: false,
        graceful_restart: None,
        allow_reflector: false,
    }
}

async fn drive(
    session: &mut Session<StaticRib, StdoutSink>,
    peer: std::net::SocketAddr,
) -> Result<(), session::Error> {
    session.new_open(false).await?;
    session.read_open().await?;
    session.send_keepalive().await?;
    session.read_keepalive().await?;
    log::info!("{peer}: established, negotiated {:?}", session.negotiated());

    session.pump_updates().await?;
    session.send_initial_eor().await?;

    let mut ticker = session.keepalive_interval().map(tokio::time::interval);
    loop {
        let hold_deadline = session.hold_timer_deadline();
        let recv = session.read_established();
        tokio::pin!(recv);
        tokio::select! {
            result = &mut recv => {
                if let Err(err) = result {
                    return Err(err);
                }
            }
            () = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; }
                    None => pending().await,
                }
            } => {
                session.send_keepalive().await?;
            }
            () = async {
                match hold_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => pending().await,
                }
            } => {
                let notify = NotifyError::hold_timer_expired();
                session.close(Some(notify), "hold timer expired").await;
                return Err(session::Error::Notify(notify));
            }
        }
    }
}

async fn handle_session(socket: TcpStream, peer: std::net::SocketAddr, config: NeighborConfig, rib: StaticRib) {
    let sink = StdoutSink { peer };
    let mut session = Session::new(socket, config, ApiFlags { parsed: true, ..ApiFlags::default() }, rib, sink);
    match drive(&mut session, peer).await {
        Ok(()) => {}
        Err(err) => {
            log::error!("{peer}: session error: {err}");
            let notify = Option::<NotifyError>::from(err);
            session.close(notify, "session error").await;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = arg::BgpdDemo::parse();
    setup_logger(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    let listen_port = connection::port_from_env(args.listen_port);
    let mut options = ConnectionOptions::default();
    if let Some(key) = &args.md5_key {
        options = options.with_md5(key.as_bytes().to_vec());
    }
    if args.gtsm {
        options = options.with_gtsm();
    }

    let listen_addr = std::net::SocketAddr::new(args.listen_addr, listen_port);
    let listener = connection::listen(listen_addr, &options).expect("failed to bind to listen address");
    log::info!("listening on {}:{listen_port}", args.listen_addr);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::error!("accept failed: {err}");
                continue;
            }
        };
        log::info!("{peer}: accepted connection");
        let config = neighbor_config(&args);
        let rib = match build_rib(&args) {
            Ok(rib) => rib,
            Err(err) => {
                log::error!("failed to build static routes: {err}");
                continue;
            }
        };
        tokio::spawn(handle_session(socket, peer, config, rib));
    }
}
