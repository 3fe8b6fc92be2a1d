//! TCP session bookkeeping (C7): one `Connection` per accepted socket, held in an
//! insertion-ordered `Vec` rather than the original's intrusive list so that closing a connection
//! mid-scan never invalidates a "next" pointer (§9 redesign note on `checkAndHandleConsumingUDPSockets`'s
//! save-next-before-callback hazard, which the same pattern would otherwise reproduce here too).

use std::io;

use cip_core::ConnectionToken;
use mio::net::TcpStream;
use mio::Token;

use crate::buffer::Buffer;

/// One live TCP session. `session_handle` is `None` until a `RegisterSession` command succeeds.
pub struct Connection {
    pub token: Token,
    pub stream: TcpStream,
    pub session_handle: Option<u32>,
    pub recv: Buffer,
    pub send: Buffer,
    /// Set once a `SendRRData`/`SendUnitData` reply is pending a writable socket.
    pub closing: bool,
    /// Bytes of an oversized frame still owed before the stream resynchronizes on the next
    /// header. Drained with `saturating_sub`, never plain subtraction (C7).
    pub pending_drain: usize,
}

impl Connection {
    pub fn new(token: Token, stream: TcpStream) -> Connection {
        Connection {
            token,
            stream,
            session_handle: None,
            recv: Buffer::new(),
            send: Buffer::new(),
            closing: false,
            pending_drain: 0,
        }
    }

    pub fn connection_token(&self) -> ConnectionToken {
        ConnectionToken(self.token.0)
    }

    /// Queue bytes for writing; the event loop flushes `send` whenever the socket is writable.
    pub fn queue_reply(&mut self, bytes: &[u8]) {
        self.send.write_slice(bytes);
    }

    /// Attempt to drain as much of `send` into the socket as is currently possible. Returns
    /// `Ok(())` on success (including "nothing to send"), or the underlying I/O error, with
    /// `WouldBlock` meaning "try again once writable".
    pub fn flush(&mut self) -> io::Result<()> {
        use std::io::Write;

        while !self.send.is_empty() {
            match self.stream.write(self.send.ingress()) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.send.move_head(n),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

/// Owns every live connection, indexed by its `mio::Token` (the OpEner original used raw array
/// index == fd; here the registry is order-independent and survives holes from closed
/// connections without shifting tokens).
#[derive(Default)]
pub struct ConnectionList {
    connections: Vec<Connection>,
}

impl ConnectionList {
    pub fn new() -> ConnectionList {
        ConnectionList { connections: Vec::new() }
    }

    pub fn insert(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn find(&self, token: Token) -> Option<&Connection> {
        self.connections.iter().find(|c| c.token == token)
    }

    pub fn find_mut(&mut self, token: Token) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.token == token)
    }

    /// Remove every connection marked `closing`, returning how many were dropped.
    pub fn reap_closed(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !c.closing);
        before - self.connections.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
