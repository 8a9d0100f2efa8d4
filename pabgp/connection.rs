//! Non-blocking TCP connection setup: accept/connect plus the two
//! socket-option seams the sans-I/O engine cannot perform portably itself,
//! TCP-MD5 signature (RFC 2385) and IP-TTL / GTSM (RFC 5082).
//!
//! The reader/writer halves are plain [`tokio::net::tcp::OwnedReadHalf`] /
//! [`tokio::net::tcp::OwnedWriteHalf`]; [`crate::session`] wraps them in
//! [`crate::Codec`] via `tokio_util::codec::{FramedRead, FramedWrite}` to
//! get the framer's byte-pump contract.

// SPDX-License-Identifier: AGPL-3.0-or-later

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Connection-level setup applied before the BGP OPEN exchange begins.
#[derive(Clone, Debug, Default)]
pub struct ConnectionOptions {
    /// TCP-MD5 signature key (RFC 2385), applied to both the listening
    /// socket (for accepted connections) and outbound connect attempts.
    pub md5_key: Option<Vec<u8>>,
    /// IP-TTL to set on the socket. `Some(255)` with `gtsm` implements the
    /// Generalized TTL Security Mechanism (RFC 5082): the peer is expected
    /// to send with TTL 255 too, and the session layer rejects anything
    /// else by checking the received TTL (not performed here -- this module
    /// only sets the *outgoing* TTL and exposes `gtsm` so callers know they
    /// should check incoming TTL themselves).
    pub ttl: Option<u32>,
    pub gtsm: bool,
}

impl ConnectionOptions {
    #[must_use]
    pub fn with_md5(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.md5_key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enable GTSM: implies (and overrides) `ttl` to 255.
    #[must_use]
    pub const fn with_gtsm(mut self) -> Self {
        self.gtsm = true;
        self.ttl = Some(255);
        self
    }
}

/// The listen/connect TCP port, honoring the historical `exabgp.tcp.port`
/// environment override (dotted names don't survive most shells, so
/// `exabgp_tcp_port` is accepted too; the dotted name wins if both are set).
#[must_use]
pub fn port_from_env(default: u16) -> u16 {
    for name in ["exabgp.tcp.port", "exabgp_tcp_port"] {
        if let Ok(value) = std::env::var(name) {
            match value.parse() {
                Ok(port) => return port,
                Err(_) => log::warn!("ignoring non-numeric {name}={value:?}"),
            }
        }
    }
    default
}

fn socket_for(peer: SocketAddr) -> io::Result<Socket> {
    let domain = if peer.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
}

fn apply_options(socket: &Socket, peer: SocketAddr, options: &ConnectionOptions) -> io::Result<()> {
    if let Some(ttl) = options.ttl {
        if peer.is_ipv4() {
            socket.set_ttl(ttl)?;
        } else {
            socket.set_unicast_hops_v6(ttl)?;
        }
    }
    if let Some(key) = &options.md5_key {
        set_md5_signature(socket, peer, key)?;
    }
    Ok(())
}

/// Connect to `peer`, applying `options` before the TCP handshake starts
/// (MD5 and TTL must be set before `connect(2)`, not after).
pub async fn connect(peer: SocketAddr, options: &ConnectionOptions) -> io::Result<TcpStream> {
    let socket = socket_for(peer)?;
    socket.set_nonblocking(true)?;
    apply_options(&socket, peer, options)?;
    let std_socket: std::net::TcpStream = socket.into();
    let socket = tokio::net::TcpSocket::from_std_stream(std_socket);
    socket.connect(peer).await
}

/// Bind a listener at `local`, applying `options` to the listening socket so
/// every accepted connection inherits them (MD5 keys and TTL set on the
/// listener apply to the 3-way handshake of incoming connections too).
pub fn listen(local: SocketAddr, options: &ConnectionOptions) -> io::Result<TcpListener> {
    let domain = if local.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;
    if let Some(ttl) = options.ttl {
        if local.is_ipv4() {
            socket.set_ttl(ttl)?;
        } else {
            socket.set_unicast_hops_v6(ttl)?;
        }
    }
    socket.bind(&local.into())?;
    socket.listen(1024)?;
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Apply a per-peer MD5 key to an already-accepted connection. On a
/// listening socket configured with [`ConnectionOptions::md5_key`] the
/// kernel already verifies incoming segments before `accept(2)` returns, so
/// this is mostly useful for outbound connect-side sockets or per-peer keys
/// that differ from the listener's default.
pub fn set_md5_signature(_socket: &Socket, _peer: SocketAddr, _key: &[u8]) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        linux_md5::apply(_socket, _peer, _key)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "TCP-MD5 signature (RFC 2385) is only implemented on Linux",
        ))
    }
}

#[cfg(target_os = "linux")]
mod linux_md5 {
    //! `TCP_MD5SIG` (RFC 2385) is a Linux-specific `setsockopt`. The kernel
    //! ABI (`linux/tcp.h`) wants a `sockaddr_storage` naming the peer, a key
    //! length and up to 80 bytes of key; we build that buffer by hand since
    //! `libc` does not expose `struct tcp_md5sig` directly.

    use socket2::Socket;
    use std::io;
    use std::net::SocketAddr;
    use std::os::fd::AsRawFd;

    const TCP_MD5SIG: libc::c_int = 14;
    const TCP_MD5SIG_MAXKEYLEN: usize = 80;

    #[repr(C)]
    struct TcpMd5Sig {
        addr: libc::sockaddr_storage,
        flags: u8,
        prefixlen: u8,
        keylen: u16,
        pad: u32,
        key: [u8; TCP_MD5SIG_MAXKEYLEN],
    }

    pub(super) fn apply(socket: &Socket, peer: SocketAddr, key: &[u8]) -> io::Result<()> {
        if key.len() > TCP_MD5SIG_MAXKEYLEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "TCP-MD5 key longer than 80 bytes",
            ));
        }
        let mut sig: TcpMd5Sig = unsafe { std::mem::zeroed() };
        match peer {
            SocketAddr::V4(addr) => {
                let raw = libc::sockaddr_in {
                    sin_family: libc::AF_INET as libc::sa_family_t,
                    sin_port: addr.port().to_be(),
                    sin_addr: libc::in_addr {
                        s_addr: u32::from_ne_bytes(addr.ip().octets()),
                    },
                    sin_zero: [0; 8],
                };
                let len = std::mem::size_of::<libc::sockaddr_in>();
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        std::ptr::addr_of!(raw).cast::<u8>(),
                        std::ptr::addr_of_mut!(sig.addr).cast::<u8>(),
                        len,
                    );
                }
            }
            SocketAddr::V6(addr) => {
                let raw = libc::sockaddr_in6 {
                    sin6_family: libc::AF_INET6 as libc::sa_family_t,
                    sin6_port: addr.port().to_be(),
                    sin6_flowinfo: addr.flowinfo(),
                    sin6_addr: libc::in6_addr {
                        s6_addr: addr.ip().octets(),
                    },
                    sin6_scope_id: addr.scope_id(),
                };
                let len = std::mem::size_of::<libc::sockaddr_in6>();
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        std::ptr::addr_of!(raw).cast::<u8>(),
                        std::ptr::addr_of_mut!(sig.addr).cast::<u8>(),
                        len,
                    );
                }
            }
        }
        sig.keylen = u16::try_from(key.len()).expect("checked above");
        sig.key[..key.len()].copy_from_slice(key);
        let ret = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::IPPROTO_TCP,
                TCP_MD5SIG,
                std::ptr::addr_of!(sig).cast::<libc::c_void>(),
                std::mem::size_of::<TcpMd5Sig>() as libc::socklen_t,
            )
        };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_options_builders() {
        let options = ConnectionOptions::default().with_ttl(64);
        assert_eq!(options.ttl, Some(64));
        assert!(!options.gtsm);

        let options = ConnectionOptions::default().with_gtsm();
        assert_eq!(options.ttl, Some(255));
        assert!(options.gtsm);

        let options = ConnectionOptions::default().with_md5(b"secret".to_vec());
        assert_eq!(options.md5_key.as_deref(), Some(&b"secret"[..]));
    }

    #[test]
    fn test_port_from_env_falls_back_to_default() {
        std::env::remove_var("exabgp.tcp.port");
        std::env::remove_var("exabgp_tcp_port");
        assert_eq!(port_from_env(179), 179);
        std::env::set_var("exabgp_tcp_port", "1790");
        assert_eq!(port_from_env(179), 1790);
        std::env::set_var("exabgp.tcp.port", "1791");
        assert_eq!(port_from_env(179), 1791);
        std::env::remove_var("exabgp.tcp.port");
        std::env::remove_var("exabgp_tcp_port");
    }
}
