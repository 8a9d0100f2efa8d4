//! The per-peer session driver: owns one [`TcpStream`], negotiates
//! capabilities, and then cooperatively pumps inbound/outbound BGP messages
//! for the life of the connection.
//!
//! The outer FSM (Idle/Connect/OpenSent/OpenConfirm/Established) and the RIB
//! storage/selection engine are external collaborators (see the crate's
//! Non-goals); [`Session`] is invoked once a TCP connection exists and is
//! generic over the [`crate::rib::OutgoingUpdates`] and [`crate::api::ApiSink`]
//! traits those collaborators implement.
//!
//! Every socket-touching operation suspends at an `.await` point rather than
//! spinning; that suspension point *is* the would-block/NOP sentinel the
//! specification describes for a non-async reactor, so no separate sentinel
//! value needs to flow through this API.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::api::{ApiFlags, ApiSink, Direction};
use crate::capability::{Afi, Safi};
use crate::codec::Codec;
use crate::error::NotifyError;
use crate::message::{
    Message, Notification, NotificationErrorCode, Open, OpenMessageErrorSubcode,
};
use crate::negotiate::{NeighborConfig, Negotiated};
use crate::path::{self, MpUnreachNlri};
use crate::rib::{OutgoingUpdates, UpdateGroup};
use crate::route::Routes;
use crate::{Error as PacketError, BGP_VERSION, MAX_BACKLOG};
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{Duration, Instant};
use tokio_util::codec::{FramedRead, FramedWrite};

/// FSM error subcodes raised by the OPEN/KEEPALIVE exchange. RFC 4271 does
/// not name these two explicitly; exabgp's own driver raises a bare FSM
/// error at the same two points, which this mirrors.
const FSM_EXPECTED_OPEN: u8 = 1;
const FSM_EXPECTED_KEEPALIVE: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("BGP notification {0:?}")]
    Notify(#[from] NotifyError),
    #[error("peer closed the connection")]
    Closed,
    #[error("peer sent a notification: {0:?}")]
    PeerNotification(Notification),
}

impl From<Error> for Option<NotifyError> {
    /// The outbound Notification to send the peer before closing, if any.
    /// I/O failures and a peer-initiated close have no outbound Notification
    /// of their own -- there's nothing left to write to, or the peer already
    /// explained itself.
    fn from(err: Error) -> Self {
        match err {
            Error::Notify(notify) => Some(notify),
            Error::Packet(packet) => Some(packet.into()),
            Error::Io(_) | Error::Closed | Error::PeerNotification(_) => None,
        }
    }
}

/// One peer's session: connection, negotiated parameters, and the RIB/API
/// collaborators it drives.
pub struct Session<Rib, Sink> {
    rx: FramedRead<OwnedReadHalf, Codec>,
    tx: FramedWrite<OwnedWriteHalf, Codec>,
    config: NeighborConfig,
    negotiated: Negotiated,
    api_flags: ApiFlags,
    sink: Sink,
    rib: Rib,
    last_inbound: Instant,
    backlog: usize,
    closed: bool,
}

impl<Rib, Sink> Session<Rib, Sink>
where
    Rib: OutgoingUpdates,
    Sink: ApiSink,
{
    #[must_use]
    pub fn new(socket: TcpStream, config: NeighborConfig, api_flags: ApiFlags, rib: Rib, sink: Sink) -> Self {
        let (rx, tx) = socket.into_split();
        Self {
            rx: FramedRead::new(rx, Codec::default()),
            tx: FramedWrite::new(tx, Codec::default()),
            config,
            negotiated: Negotiated::empty(),
            api_flags,
            sink,
            rib,
            last_inbound: Instant::now(),
            backlog: 0,
            closed: false,
        }
    }

    #[must_use]
    pub const fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    /// Send our OPEN. `restarted` marks this as a graceful-restart reconnect
    /// (folded into the advertised Graceful-Restart R-bit).
    pub async fn new_open(&mut self, restarted: bool) -> Result<(), Error> {
        let capabilities = self.config.build_capabilities(restarted);
        let open = Open::new_easy(
            self.config.local_asn,
            self.config.hold_time,
            self.config.router_id,
            capabilities,
        );
        self.negotiated.mark_sent();
        self.tx.feed(Message::Open(open)).await?;
        self.tx.flush().await?;
        Ok(())
    }

    /// Consume inbound messages until the peer's OPEN arrives, validate it
    /// and derive [`Negotiated`]. Anything else (other than a peer
    /// NOTIFICATION) raises FSM error 1.
    pub async fn read_open(&mut self) -> Result<(), Error> {
        let local_caps = self.config.build_capabilities(false);
        match self.next_message().await? {
            Message::Open(open) => {
                if open.version != BGP_VERSION {
                    return Err(NotifyError::new(
                        NotificationErrorCode::OpenMessageError,
                        OpenMessageErrorSubcode::UnsupportedVersionNumber as u8,
                    )
                    .into());
                }
                let negotiated = Negotiated::negotiate(&self.config, &local_caps, &open)?;
                self.negotiated = negotiated;
                Ok(())
            }
            Message::Notification(notif) => Err(Error::PeerNotification(notif)),
            _ => Err(NotifyError::fsm_error(FSM_EXPECTED_OPEN).into()),
        }
    }

    /// Consume inbound messages until a KEEPALIVE arrives (OpenConfirm).
    /// Anything else (other than a peer NOTIFICATION) raises FSM error 2.
    pub async fn read_keepalive(&mut self) -> Result<(), Error> {
        match self.next_message().await? {
            Message::Keepalive => Ok(()),
            Message::Notification(notif) => Err(Error::PeerNotification(notif)),
            _ => Err(NotifyError::fsm_error(FSM_EXPECTED_KEEPALIVE).into()),
        }
    }

    /// Send our KEEPALIVE (OpenConfirm response, or established-state
    /// cadence).
    pub async fn send_keepalive(&mut self) -> Result<(), Error> {
        self.tx.feed(Message::Keepalive).await?;
        self.tx.flush().await?;
        Ok(())
    }

    /// Request a ROUTE-REFRESH for `(afi, safi)` from the peer (RFC 2918).
    /// `demarcation` is only meaningful when Enhanced Route-Refresh (RFC
    /// 7313) was negotiated; pass `None` otherwise. Fails locally without
    /// writing anything if route-refresh was not negotiated, mirroring the
    /// same check applied to an inbound ROUTE-REFRESH.
    pub async fn send_route_refresh(
        &mut self,
        afi: Afi,
        safi: Safi,
        demarcation: Option<bool>,
    ) -> Result<(), Error> {
        if !self.negotiated.route_refresh {
            return Err(PacketError::RouteRefreshNotNegotiated.into());
        }
        let refresh = crate::message::RouteRefresh { afi, safi, demarcation };
        self.tx.feed(Message::RouteRefresh(refresh)).await?;
        self.tx.flush().await?;
        if self.api_flags.send.route_refresh {
            self.sink.refresh(&refresh, &[], &[]);
        }
        Ok(())
    }

    /// Emit End-of-RIB for every negotiated family once the initial table
    /// dump has been pushed through [`Self::pump_updates`]. When no family
    /// negotiated Multiprotocol, a single KEEPALIVE stands in for EOR (a
    /// known compatibility shim predating the EOR RFC clarifications).
    pub async fn send_initial_eor(&mut self) -> Result<(), Error> {
        if self.negotiated.families.is_empty() {
            return self.send_keepalive().await;
        }
        for &(afi, safi) in &self.negotiated.families.clone() {
            if afi == Afi::Ipv4 && safi == Safi::Unicast {
                self.tx.feed(Message::Update(crate::message::Update::legacy_eor())).await?;
            } else {
                let eor = path::Value {
                    flags: path::Flags::OPTIONAL_TRANSITIVE_EXTENDED,
                    data: path::Data::MpUnreachNlri(MpUnreachNlri {
                        afi,
                        safi,
                        withdrawn_routes: Routes::default(),
                    }),
                };
                let update = crate::message::Update {
                    withdrawn_routes: Routes::default(),
                    path_attributes: path::PathAttributes(vec![eor]),
                    nlri: Routes::default(),
                };
                self.tx.feed(Message::Update(update)).await?;
            }
        }
        self.tx.flush().await?;
        Ok(())
    }

    /// Pull batches from the RIB and push them into the writer, bounded by
    /// [`MAX_BACKLOG`] chunked PDUs enqueued since the last flush. Returns
    /// without pulling more once at the bound, providing backpressure to the
    /// RIB; the caller is expected to call this again on the next
    /// cooperative tick.
    pub async fn pump_updates(&mut self) -> Result<(), Error> {
        if self.backlog >= MAX_BACKLOG {
            return Ok(());
        }
        let budget = MAX_BACKLOG - self.backlog;
        let mut pulled = 0usize;
        'outer: for group in self.rib.updates(true) {
            for update in group.messages(&self.negotiated) {
                self.tx.feed(Message::Update(update.clone())).await?;
                if self.api_flags.send.update {
                    self.sink.message(Direction::Send, &Message::Update(update), &[], &[]);
                }
                self.backlog += 1;
                pulled += 1;
                if pulled >= budget {
                    break 'outer;
                }
            }
        }
        if pulled > 0 {
            self.tx.flush().await?;
            self.backlog = 0;
        }
        Ok(())
    }

    /// One pass of the Established-state inbound path: read one message,
    /// update the hold-timer clock, and dispatch it to the API sink per
    /// [`ApiFlags`]. Returns `Ok(true)` while the session should continue,
    /// `Ok(false)` on a locally-initiated graceful close race that the
    /// caller already handled.
    pub async fn read_established(&mut self) -> Result<(), Error> {
        let message = self.next_message().await?;
        self.last_inbound = Instant::now();
        match message {
            Message::Keepalive => {
                if self.api_flags.receive.keepalive {
                    self.sink.message(Direction::Receive, &Message::Keepalive, &[], &[]);
                }
                Ok(())
            }
            Message::Notification(notif) => {
                self.sink.notification(&notif, &[], &notif.data);
                Err(Error::PeerNotification(notif))
            }
            Message::Update(update) => {
                if self.api_flags.wants_parsed_update() {
                    self.sink.message(Direction::Receive, &Message::Update(update), &[], &[]);
                }
                Ok(())
            }
            Message::RouteRefresh(refresh) => {
                if !self.negotiated.route_refresh {
                    return Err(PacketError::RouteRefreshNotNegotiated.into());
                }
                self.sink.refresh(&refresh, &[], &[]);
                Ok(())
            }
            Message::Operational(op) => {
                if self.api_flags.receive.operational {
                    self.sink.message(Direction::Receive, &Message::Operational(op), &[], &[]);
                }
                Ok(())
            }
            Message::Open(_) => Err(NotifyError::fsm_error(FSM_EXPECTED_KEEPALIVE).into()),
        }
    }

    /// Whether the hold timer (if enabled) has expired since the last
    /// inbound message.
    #[must_use]
    pub fn hold_timer_deadline(&self) -> Option<Instant> {
        (self.negotiated.hold_time != 0)
            .then(|| self.last_inbound + Duration::from_secs(u64::from(self.negotiated.hold_time)))
    }

    /// The conventional send-side keepalive cadence: hold-time / 3.
    #[must_use]
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.negotiated.hold_time != 0)
            .then(|| Duration::from_secs(u64::from(self.negotiated.hold_time) / 3).max(Duration::from_secs(1)))
    }

    async fn next_message(&mut self) -> Result<Message, Error> {
        match self.rx.next().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(err)) => Err(err.into()),
            None => Err(Error::Closed),
        }
    }

    /// Idempotent close: abandons in-flight I/O and posts exactly one
    /// down-event. A notification is written to the peer first if `reason`
    /// carries one and the session was not already closing because the peer
    /// itself sent a NOTIFICATION.
    pub async fn close(&mut self, notify: Option<NotifyError>, reason: &str) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(notify) = notify {
            // Best-effort: a write failure here doesn't change the outcome,
            // we're closing either way.
            let _ = self.tx.feed(Message::Notification(notify.to_notification())).await;
            let _ = self.tx.flush().await;
        }
        self.sink.down(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rib::StaticRib;
    use std::net::Ipv4Addr;

    fn config() -> NeighborConfig {
        NeighborConfig {
            local_asn: 65000,
            remote_asn: 65001,
            router_id: Ipv4Addr::new(192, 0, 2, 1),
            hold_time: 90,
            families: vec![(Afi::Ipv4, Safi::Unicast)],
            add_path: Vec::new(),
            route_refresh: true,
            enhanced_route_refresh: false,
            extended_message: false,
            aigp: false,
            graceful_restart: None,
            allow_reflector: false,
        }
    }

    #[tokio::test]
    async fn test_session_open_exchange_and_keepalive() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client_task = tokio::spawn(async move { tokio::net::TcpStream::connect(addr).await.unwrap() });
        let (server_socket, _) = listener.accept().await.unwrap();
        let client_socket = client_task.await.unwrap();

        let mut server = Session::new(server_socket, config(), ApiFlags::default(), StaticRib::new(), crate::api::NullSink);
        let mut client_config = config();
        client_config.local_asn = config().remote_asn;
        client_config.remote_asn = config().local_asn;
        client_config.router_id = Ipv4Addr::new(192, 0, 2, 2);
        let mut client = Session::new(client_socket, client_config, ApiFlags::default(), StaticRib::new(), crate::api::NullSink);

        let (server_res, client_res) = tokio::join!(
            async {
                server.new_open(false).await?;
                server.read_open().await?;
                server.send_keepalive().await?;
                server.read_keepalive().await
            },
            async {
                client.new_open(false).await?;
                client.read_open().await?;
                client.send_keepalive().await?;
                client.read_keepalive().await
            }
        );
        server_res.unwrap();
        client_res.unwrap();
        assert!(server.negotiated().is_ready());
        assert!(client.negotiated().is_ready());
    }

    #[tokio::test]
    async fn test_read_open_rejects_non_open_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client_task = tokio::spawn(async move {
            let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();
            let mut codec = Codec::default();
            let mut buf = bytes::BytesMut::new();
            tokio_util::codec::Encoder::<Message>::encode(&mut codec, Message::Keepalive, &mut buf).unwrap();
            use tokio::io::AsyncWriteExt;
            socket.write_all(&buf).await.unwrap();
        });
        let (server_socket, _) = listener.accept().await.unwrap();
        client_task.await.unwrap();
        let mut server = Session::new(server_socket, config(), ApiFlags::default(), StaticRib::new(), crate::api::NullSink);
        let err = server.read_open().await.unwrap_err();
        assert!(matches!(err, Error::Notify(e) if e.code == NotificationErrorCode::FiniteStateMachineError));
    }

    #[tokio::test]
    async fn test_route_refresh_round_trip_and_rejection_when_not_negotiated() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client_task = tokio::spawn(async move { tokio::net::TcpStream::connect(addr).await.unwrap() });
        let (server_socket, _) = listener.accept().await.unwrap();
        let client_socket = client_task.await.unwrap();

        let mut server = Session::new(server_socket, config(), ApiFlags::default(), StaticRib::new(), crate::api::NullSink);
        server.negotiated.route_refresh = true;
        let mut client = Session::new(client_socket, config(), ApiFlags::default(), StaticRib::new(), crate::api::NullSink);
        client.negotiated.route_refresh = true;

        server.send_route_refresh(Afi::Ipv4, Safi::Unicast, None).await.unwrap();
        client.read_established().await.unwrap();

        client.negotiated.route_refresh = false;
        server.send_route_refresh(Afi::Ipv4, Safi::Unicast, None).await.unwrap();
        let err = client.read_established().await.unwrap_err();
        assert!(matches!(err, Error::Packet(PacketError::RouteRefreshNotNegotiated)));
    }
}
