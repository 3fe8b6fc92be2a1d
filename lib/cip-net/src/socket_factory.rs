//! UDP socket factory (§4.11), grounded in `CreateUdpSocket` in `networkhandler.c`: reuse-address,
//! optional broadcast, and a multicast TTL.
//!
//! The original passed the TTL's address but the wrong option length to `setsockopt`
//! (`sizeof(CipUdint)` where the value was actually a `CipUsint`), which on at least one
//! affected platform silently left the TTL unset. `socket2` computes the correct option length
//! for `set_multicast_ttl_v4` itself, so that bug class can't reproduce here.

use std::io;
use std::net::SocketAddr;

use mio::net::UdpSocket;
use socket2::{Domain, Protocol, Socket, Type};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UdpSocketKind {
    /// Bound to the broadcast listener port, receives `SO_BROADCAST` datagrams.
    Broadcast,
    /// A per-connection consuming socket opened in response to a forward-open (C9).
    Consuming,
}

/// Default multicast TTL for CIP traffic, matching the original's constant.
pub const DEFAULT_MULTICAST_TTL: u32 = 1;

/// Create a UDP socket for `kind`, optionally connected to `peer`.
///
/// A consuming or peer-to-peer producing socket (§4.11) is opened for one specific originator —
/// the TCP peer whose forward-open request caused it — so `peer` is resolved from that
/// connection's `active_connection` token and passed here rather than left for every `send_to`/
/// `recv_from` call to repeat. `socket2::Socket::connect` restricts the socket to that single
/// peer, matching the original's per-connection consuming socket semantics in
/// `CreateUdpSocket`/`OpenCommunicationChannel`. The broadcast listener passes `None`: it serves
/// every originator on the wire, not one peer.
pub fn create_udp_socket(
    kind: UdpSocketKind,
    bind_addr: SocketAddr,
    multicast_ttl: u32,
    peer: Option<SocketAddr>,
) -> io::Result<UdpSocket> {
    let domain = Domain::for_address(bind_addr);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    if kind == UdpSocketKind::Broadcast {
        socket.set_broadcast(true)?;
    }

    if domain == Domain::IPV4 {
        socket.set_multicast_ttl_v4(multicast_ttl)?;
    }

    socket.bind(&bind_addr.into())?;

    if let Some(peer) = peer {
        socket.connect(&peer.into())?;
    }

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_a_bound_nonblocking_socket() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let socket = create_udp_socket(UdpSocketKind::Consuming, addr, DEFAULT_MULTICAST_TTL, None).unwrap();

        assert!(socket.local_addr().unwrap().port() != 0);
    }

    #[test]
    fn broadcast_socket_can_be_created_on_an_ephemeral_port() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let socket = create_udp_socket(UdpSocketKind::Broadcast, addr, DEFAULT_MULTICAST_TTL, None);

        assert!(socket.is_ok());
    }

    #[test]
    fn consuming_socket_connects_to_the_given_peer() {
        let peer_socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer_addr = peer_socket.local_addr().unwrap();

        let socket = create_udp_socket(
            UdpSocketKind::Consuming,
            "127.0.0.1:0".parse().unwrap(),
            DEFAULT_MULTICAST_TTL,
            Some(peer_addr),
        )
        .unwrap();

        assert_eq!(socket.peer_addr().unwrap(), peer_addr);
    }
}
