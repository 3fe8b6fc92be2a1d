//! The socket multiplexer (C6), grounded in `NetworkHandler_ProcessOnce` in `networkhandler.c`:
//! one `mio::Poll` registering the TCP listener, the UDP broadcast socket, every live TCP
//! connection, and every consuming UDP socket, woken on whichever fires first or when the next
//! tick is due.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, UdpSocket};
use mio::{Events, Interest, Poll, Token};

use cip_core::ConnectionToken;
use cip_support::error::{ErrorUtils, NetworkResult};
use cip_support::logging::{debug, info, trace, warn, Logger};

use crate::connection::{Connection, ConnectionList};
use crate::encapsulation::{EncapHeader, EncapsulationHandler, HEADER_LENGTH};
use crate::periodic::PeriodicDriver;
use crate::socket_factory::{self, UdpSocketKind};
use crate::tcp;
use crate::udp::{self, ConsumingSocket, ConsumingSockets};

const LISTENER_TOKEN: Token = Token(0);
const BROADCAST_TOKEN: Token = Token(1);
const FIRST_DYNAMIC_TOKEN: usize = 2;

/// Everything the event loop multiplexes: the accepting listener, the broadcast socket, live
/// connections, consuming sockets, and the periodic driver. One owned value — see the §9
/// redesign note on replacing ambient globals with an explicit, constructible loop.
pub struct EventLoop {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    broadcast: UdpSocket,
    connections: ConnectionList,
    consuming: ConsumingSockets,
    next_token: usize,
    periodic: PeriodicDriver,
    logger: Logger,
}

impl EventLoop {
    pub fn new(
        tcp_addr: SocketAddr,
        broadcast: UdpSocket,
        tick: Duration,
        now: Instant,
        logger: Logger,
    ) -> io::Result<EventLoop> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(tcp_addr)?;
        let mut broadcast = broadcast;

        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        poll.registry().register(&mut broadcast, BROADCAST_TOKEN, Interest::READABLE)?;

        Ok(EventLoop {
            poll,
            events: Events::with_capacity(128),
            listener,
            broadcast,
            connections: ConnectionList::new(),
            consuming: ConsumingSockets::new(),
            next_token: FIRST_DYNAMIC_TOKEN,
            periodic: PeriodicDriver::new(tick, now),
            logger,
        })
    }

    fn allocate_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// One iteration: block on readiness up to `timeout` (or the next tick, whichever is
    /// sooner), then service whatever fired. Mirrors the outer loop body of
    /// `NetworkHandler_ProcessOnce`.
    pub fn poll_once(
        &mut self,
        now: Instant,
        handler: &mut dyn EncapsulationHandler,
        on_tick: &mut dyn FnMut(&mut ConnectionList),
        on_io: &mut dyn FnMut(u32, &[u8]),
    ) -> io::Result<()> {
        let timeout = self.periodic.remaining().min(Duration::from_millis(250));
        self.poll.poll(&mut self.events, Some(timeout))?;

        trace!(self.logger, "poll woke"; "ready_count" => self.events.iter().count());

        let fired: Vec<(Token, bool, bool)> = self
            .events
            .iter()
            .map(|event| (event.token(), event.is_readable(), event.is_writable()))
            .collect();

        for (token, readable, writable) in fired {
            match token {
                LISTENER_TOKEN => self.accept_all()?,
                BROADCAST_TOKEN => self.service_broadcast(handler),
                _ if self.consuming.find(token).is_some() => self.service_consuming(on_io),
                _ => self.service_connection(token, readable, writable, handler),
            }
        }

        let connections = &mut self.connections;
        self.periodic.drive(now, || on_tick(&mut *connections));

        self.connections.reap_closed();
        Ok(())
    }

    fn accept_all(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = self.allocate_token();
                    self.poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE | Interest::WRITABLE)?;
                    info!(self.logger, "connection accepted"; "token" => token.0, "peer" => %peer);
                    self.connections.insert(Connection::new(token, stream));
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    fn service_connection(&mut self, token: Token, readable: bool, writable: bool, handler: &mut dyn EncapsulationHandler) {
        let Some(connection) = self.connections.find_mut(token) else {
            return;
        };

        if readable {
            let result = tcp::handle_readable(connection, handler, &self.logger);
            if result.has_failed() {
                connection.closing = true;
            }
        }

        if writable && !connection.send.is_empty() {
            if let Err(err) = connection.flush() {
                if err.kind() != io::ErrorKind::WouldBlock {
                    connection.closing = true;
                }
            }
        }
    }

    /// Decode and answer every encapsulation message packed into one datagram (C8). A client may
    /// concatenate several requests into a single `sendto`; each gets its own reply datagram.
    fn service_broadcast(&mut self, handler: &mut dyn EncapsulationHandler) {
        let broadcast = &self.broadcast;
        let logger = &self.logger;
        let result: NetworkResult<()> = udp::drain_datagrams(broadcast, logger, |datagram| {
            let received = datagram.bytes.len();
            let mut consumed = 0;

            while received - consumed >= HEADER_LENGTH {
                let remaining = &datagram.bytes[consumed..];
                let header = match EncapHeader::decode(remaining) {
                    Ok(header) => header,
                    Err(_) => {
                        warn!(logger, "broadcast datagram header truncated"; "peer" => %datagram.peer);
                        break;
                    }
                };

                let frame_length = HEADER_LENGTH + header.length as usize;
                if remaining.len() < frame_length {
                    warn!(logger, "broadcast datagram shorter than its declared length"; "peer" => %datagram.peer);
                    break;
                }

                let payload = &remaining[HEADER_LENGTH..frame_length];
                let reply = handler.handle(&header, payload, None);
                let _ = udp::send_to(broadcast, datagram.peer, &reply);

                consumed += frame_length;
            }
        });
        let _ = result;
    }

    fn service_consuming(&mut self, on_io: &mut dyn FnMut(u32, &[u8])) {
        self.consuming.poll_all(&self.logger, |connection_id, datagram| {
            on_io(connection_id, &datagram.bytes);
        });
    }

    pub fn connections(&self) -> &ConnectionList {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionList {
        &mut self.connections
    }

    pub fn register_consuming(&mut self, socket: crate::udp::ConsumingSocket) -> io::Result<()> {
        let mut socket = socket;
        self.poll
            .registry()
            .register(&mut socket.socket, socket.token, Interest::READABLE)?;
        debug!(self.logger, "consuming socket registered"; "token" => socket.token.0, "peer" => %socket.peer);
        self.consuming.insert(socket);
        Ok(())
    }

    /// Open and register a peer-to-peer consuming socket for `active_connection` (§4.11, §9): the
    /// peer address is resolved from the live TCP connection itself (`TcpStream::peer_addr`)
    /// rather than an ambient "current socket" global, then handed to the socket factory so the
    /// new UDP socket is connected to exactly that originator.
    pub fn open_consuming_socket_for(
        &mut self,
        active_connection: ConnectionToken,
        connection_id: u32,
        bind_addr: SocketAddr,
        multicast_ttl: u32,
    ) -> io::Result<()> {
        let token = Token(active_connection.0);
        let connection = self
            .connections
            .find(token)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no live connection for that token"))?;
        let peer = connection.stream.peer_addr()?;

        let socket = socket_factory::create_udp_socket(UdpSocketKind::Consuming, bind_addr, multicast_ttl, Some(peer))?;
        let consuming_token = self.allocate_token();

        self.register_consuming(ConsumingSocket {
            token: consuming_token,
            socket,
            peer,
            connection_id,
        })
    }

    pub fn local_tcp_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn local_broadcast_addr(&self) -> io::Result<SocketAddr> {
        self.broadcast.local_addr()
    }
}
