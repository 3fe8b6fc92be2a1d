//! TCP session handling (C7), grounded in `handleDataOnTCPSocket` in `networkhandler.c`: drain
//! the socket into the connection's receive buffer, then pull out as many complete encapsulation
//! frames as are buffered.

use std::io::Read;

use cip_support::error::NetworkResult;
use cip_support::logging::{debug, warn, Logger};

use crate::connection::Connection;
use crate::encapsulation::{EncapHeader, EncapsulationHandler, HEADER_LENGTH};

/// Frames larger than this are discarded rather than buffered in full — a client sending a
/// bogus or hostile length shouldn't be able to force unbounded allocation.
pub const MAX_FRAME_LENGTH: usize = 600;

/// Read everything currently available on the socket and process every complete frame it
/// produces. Returns once the socket would block; `NetworkError::Wait` from that point is the
/// expected, non-fatal terminal condition, not a failure.
pub fn handle_readable(
    connection: &mut Connection,
    handler: &mut dyn EncapsulationHandler,
    logger: &Logger,
) -> NetworkResult<()> {
    loop {
        let space = connection.recv.egress();
        let read = connection.stream.read(space)?;

        if read == 0 {
            debug!(logger, "connection closed by peer"; "token" => connection.token.0);
            connection.closing = true;
            return Ok(());
        }

        connection.recv.move_tail(read);
        process_frames(connection, handler, logger);
    }
}

fn process_frames(connection: &mut Connection, handler: &mut dyn EncapsulationHandler, logger: &Logger) {
    let active_connection = Some(connection.connection_token());

    loop {
        if connection.pending_drain > 0 {
            let available = connection.recv.len();
            let drained = available.min(connection.pending_drain);
            connection.recv.move_head(drained);
            // saturating: a read can deliver more bytes than are still owed, and plain
            // subtraction would underflow the counter right here (the original's bug).
            connection.pending_drain = connection.pending_drain.saturating_sub(drained);
            if connection.pending_drain > 0 {
                return;
            }
            continue;
        }

        if connection.recv.len() < HEADER_LENGTH {
            return;
        }

        let header = match EncapHeader::decode(connection.recv.ingress()) {
            Ok(header) => header,
            Err(_) => return,
        };

        if header.length as usize > MAX_FRAME_LENGTH {
            warn!(logger, "oversized frame discarded"; "token" => connection.token.0, "length" => header.length);
            let available = connection.recv.len() - HEADER_LENGTH;
            let owed = header.length as usize;
            let drained_now = available.min(owed);
            connection.recv.move_head(HEADER_LENGTH + drained_now);
            connection.pending_drain = owed.saturating_sub(drained_now);
            continue;
        }

        let frame_length = HEADER_LENGTH + header.length as usize;
        if connection.recv.len() < frame_length {
            return;
        }

        let reply = handler.handle(
            &header,
            &connection.recv.ingress()[HEADER_LENGTH..frame_length],
            active_connection,
        );
        connection.recv.move_head(frame_length);
        connection.queue_reply(&reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encapsulation::{Command, EncapsulationStatus};
    use mio::net::TcpStream;
    use mio::Token;
    use std::io::Write;
    use std::net::TcpListener as StdTcpListener;

    struct Echo;

    impl EncapsulationHandler for Echo {
        fn handle(&mut self, header: &EncapHeader, payload: &[u8], _active_connection: Option<cip_core::ConnectionToken>) -> Vec<u8> {
            let reply_header = EncapHeader::reply_to(header, EncapsulationStatus::Success, payload.len() as u16);
            let mut bytes = vec![0u8; HEADER_LENGTH];
            reply_header.encode((&mut bytes[..HEADER_LENGTH]).try_into().unwrap());
            bytes.extend_from_slice(payload);
            bytes
        }
    }

    fn connected_pair() -> (Connection, std::net::TcpStream) {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (Connection::new(Token(0), TcpStream::from_std(server)), client)
    }

    fn encode_frame(command: Command, session_handle: u32, payload: &[u8]) -> Vec<u8> {
        let header = EncapHeader {
            command,
            length: payload.len() as u16,
            session_handle,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        let mut bytes = vec![0u8; HEADER_LENGTH];
        header.encode((&mut bytes[..HEADER_LENGTH]).try_into().unwrap());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn processes_one_complete_frame_and_queues_a_reply() {
        let (mut connection, mut client) = connected_pair();
        let mut handler = Echo;

        let frame = encode_frame(Command::RegisterSession, 0, &[0xAA, 0xBB]);
        client.write_all(&frame).unwrap();

        let result = handle_readable(&mut connection, &mut handler, &cip_support::logging::discard());

        assert!(result.is_err()); // WouldBlock once drained, expected
        assert!(!connection.send.is_empty());
        assert_eq!(connection.send.ingress().len(), HEADER_LENGTH + 2);
    }

    #[test]
    fn partial_frame_is_left_buffered_until_the_rest_arrives() {
        let (mut connection, mut client) = connected_pair();
        let mut handler = Echo;

        let frame = encode_frame(Command::RegisterSession, 0, &[0xAA, 0xBB, 0xCC]);
        client.write_all(&frame[..HEADER_LENGTH + 1]).unwrap();

        handle_readable(&mut connection, &mut handler, &cip_support::logging::discard()).unwrap_err();
        assert!(connection.send.is_empty());

        client.write_all(&frame[HEADER_LENGTH + 1..]).unwrap();
        handle_readable(&mut connection, &mut handler, &cip_support::logging::discard()).unwrap_err();

        assert!(!connection.send.is_empty());
    }

    #[test]
    fn oversized_frame_is_drained_without_underflowing_the_counter() {
        let (mut connection, mut client) = connected_pair();
        let mut handler = Echo;

        let oversized_len = (MAX_FRAME_LENGTH + 50) as u16;
        let header = EncapHeader {
            command: Command::SendRrData,
            length: oversized_len,
            session_handle: 1,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        let mut bytes = vec![0u8; HEADER_LENGTH];
        header.encode((&mut bytes[..HEADER_LENGTH]).try_into().unwrap());
        // One read delivers more than `oversized_len` bytes of payload — exactly the situation
        // that would underflow a plain-subtraction drain counter. The trailing 10 bytes are too
        // short to look like a follow-on header, so they're left buffered rather than parsed.
        bytes.extend_from_slice(&vec![0u8; oversized_len as usize + 10]);
        client.write_all(&bytes).unwrap();

        handle_readable(&mut connection, &mut handler, &cip_support::logging::discard()).unwrap_err();

        assert_eq!(connection.pending_drain, 0);
        assert!(connection.send.is_empty());
        assert_eq!(connection.recv.len(), 10);
    }
}
