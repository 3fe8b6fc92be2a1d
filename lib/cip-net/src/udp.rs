//! UDP datagram handling: the broadcast listener (C8, grounded in
//! `checkAndHandleUDPBroadCastSocket`) and per-connection consuming sockets (C9, grounded in
//! `checkAndHandleConsumingUDPSockets`).
//!
//! The original iterates an array of consuming sockets with a raw "save next index before the
//! callback" pattern because a callback could close and recycle a slot out from under the loop.
//! Here `ConsumingSockets` is a plain `Vec` the caller scans top-down by index with an explicit
//! removal list applied after the scan, so a socket closing mid-scan can never alias a slot that
//! hasn't been visited yet (§9).

use std::io;
use std::net::SocketAddr;

use mio::net::UdpSocket;
use mio::Token;

use cip_support::error::NetworkResult;
use cip_support::logging::{trace, warn, Logger};

use crate::encapsulation::EncapHeader;
use crate::encapsulation::HEADER_LENGTH;

/// Max UDP datagram this stack will accept; CIP I/O messages are small and fixed-size per
/// connection, so anything larger is simply not ours.
pub const MAX_DATAGRAM_LENGTH: usize = 1500;

/// One inbound datagram, addressed and already sliced to its received length.
pub struct Datagram {
    pub peer: SocketAddr,
    pub bytes: Vec<u8>,
}

/// Drain every datagram currently queued on `socket`, handing each to `on_datagram`. Mirrors
/// `checkAndHandleUDPBroadCastSocket`'s `recvfrom` loop, generalized to run until `WouldBlock`
/// rather than a single fixed read per poll tick.
pub fn drain_datagrams<F>(socket: &UdpSocket, logger: &Logger, mut on_datagram: F) -> NetworkResult<()>
where
    F: FnMut(Datagram),
{
    let mut buf = [0u8; MAX_DATAGRAM_LENGTH];
    loop {
        let (len, peer) = socket.recv_from(&mut buf)?;
        trace!(logger, "datagram received"; "peer" => %peer, "length" => len);
        on_datagram(Datagram {
            peer,
            bytes: buf[..len].to_vec(),
        });
    }
}

/// A registered consuming socket (C9): a peer-to-peer UDP socket opened for one forward-open
/// connection, identified by the `Token` the event loop polls it under.
pub struct ConsumingSocket {
    pub token: Token,
    pub socket: UdpSocket,
    pub peer: SocketAddr,
    pub connection_id: u32,
}

#[derive(Default)]
pub struct ConsumingSockets {
    sockets: Vec<ConsumingSocket>,
}

impl ConsumingSockets {
    pub fn new() -> ConsumingSockets {
        ConsumingSockets { sockets: Vec::new() }
    }

    pub fn insert(&mut self, socket: ConsumingSocket) {
        self.sockets.push(socket);
    }

    pub fn find(&self, token: Token) -> Option<&ConsumingSocket> {
        self.sockets.iter().find(|s| s.token == token)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Scan every socket by index (never following a "next" pointer a callback could invalidate),
    /// draining datagrams through `on_datagram`. Sockets whose datagram handling signals closure
    /// are collected and removed only after the full scan completes.
    pub fn poll_all<F>(&mut self, logger: &Logger, mut on_datagram: F)
    where
        F: FnMut(u32, Datagram),
    {
        let mut closed = Vec::new();

        for index in 0..self.sockets.len() {
            let result = drain_datagrams(&self.sockets[index].socket, logger, |datagram| {
                on_datagram(self.sockets[index].connection_id, datagram);
            });

            if let Err(err) = result {
                if err != cip_support::error::NetworkError::Wait {
                    warn!(logger, "consuming socket closed"; "connection_id" => self.sockets[index].connection_id);
                    closed.push(index);
                }
            }
        }

        for index in closed.into_iter().rev() {
            self.sockets.remove(index);
        }
    }
}

/// Encode an encapsulation reply (header + payload) for sending back over UDP, used by the
/// broadcast handler to answer `ListIdentity`/`ListServices` queries (C8).
pub fn encode_reply(header: &EncapHeader, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_LENGTH];
    header.encode((&mut bytes[..HEADER_LENGTH]).try_into().expect("fixed-size header"));
    bytes.extend_from_slice(payload);
    bytes
}

pub fn send_to(socket: &UdpSocket, peer: SocketAddr, bytes: &[u8]) -> io::Result<usize> {
    socket.send_to(bytes, peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encapsulation::{Command, EncapsulationStatus};

    #[test]
    fn drains_every_queued_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        client.connect(server_addr).unwrap();
        client.send(b"one").unwrap();
        client.send(b"two").unwrap();

        let mut received = Vec::new();
        let result = drain_datagrams(&server, &cip_support::logging::discard(), |datagram| received.push(datagram.bytes));

        assert!(result.is_err());
        assert_eq!(received, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn encodes_a_reply_with_header_and_payload() {
        let request = EncapHeader {
            command: Command::ListIdentity,
            length: 0,
            session_handle: 0,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        let reply_header = EncapHeader::reply_to(&request, EncapsulationStatus::Success, 2);

        let encoded = encode_reply(&reply_header, &[0xAA, 0xBB]);

        assert_eq!(encoded.len(), HEADER_LENGTH + 2);
        assert_eq!(&encoded[HEADER_LENGTH..], &[0xAA, 0xBB]);
    }

    #[test]
    fn consuming_sockets_survive_index_based_scan_when_one_closes() {
        let mut sockets = ConsumingSockets::new();
        for i in 0..3 {
            let socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
            sockets.insert(ConsumingSocket {
                token: Token(i),
                socket,
                peer: "127.0.0.1:1".parse().unwrap(),
                connection_id: i as u32,
            });
        }

        assert_eq!(sockets.len(), 3);
        sockets.poll_all(&cip_support::logging::discard(), |_, _| {});
        // No real errors occurred (all WouldBlock), so nothing should have been reaped.
        assert_eq!(sockets.len(), 3);
    }
}
