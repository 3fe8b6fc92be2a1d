//! Encapsulation framing (C5): the 24-byte EtherNet/IP header that wraps every TCP and UDP
//! message, and the seam concrete command handlers plug into.

use byteorder::{ByteOrder, LittleEndian};

use cip_core::ConnectionToken;

pub const HEADER_LENGTH: usize = 24;
pub const SENDER_CONTEXT_LENGTH: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    Nop,
    ListServices,
    ListIdentity,
    ListInterfaces,
    RegisterSession,
    UnRegisterSession,
    SendRrData,
    SendUnitData,
    Unknown(u16),
}

impl From<u16> for Command {
    fn from(value: u16) -> Command {
        match value {
            0x0000 => Command::Nop,
            0x0004 => Command::ListServices,
            0x0063 => Command::ListIdentity,
            0x0064 => Command::ListInterfaces,
            0x0065 => Command::RegisterSession,
            0x0066 => Command::UnRegisterSession,
            0x006F => Command::SendRrData,
            0x0070 => Command::SendUnitData,
            other => Command::Unknown(other),
        }
    }
}

impl From<Command> for u16 {
    fn from(command: Command) -> u16 {
        match command {
            Command::Nop => 0x0000,
            Command::ListServices => 0x0004,
            Command::ListIdentity => 0x0063,
            Command::ListInterfaces => 0x0064,
            Command::RegisterSession => 0x0065,
            Command::UnRegisterSession => 0x0066,
            Command::SendRrData => 0x006F,
            Command::SendUnitData => 0x0070,
            Command::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum EncapsulationStatus {
    Success = 0x0000,
    InvalidCommand = 0x0001,
    InsufficientMemory = 0x0002,
    IncorrectData = 0x0003,
    InvalidSessionHandle = 0x0064,
    InvalidLength = 0x0065,
    UnsupportedProtocolRevision = 0x0069,
}

/// The 24-byte encapsulation header: command, payload length, session handle, status, an
/// opaque sender context the originator expects echoed back, and an options field (always 0).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EncapHeader {
    pub command: Command,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: [u8; SENDER_CONTEXT_LENGTH],
    pub options: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EncapsulationError {
    Truncated,
}

impl EncapHeader {
    pub fn decode(data: &[u8]) -> Result<EncapHeader, EncapsulationError> {
        if data.len() < HEADER_LENGTH {
            return Err(EncapsulationError::Truncated);
        }

        let mut sender_context = [0u8; SENDER_CONTEXT_LENGTH];
        sender_context.copy_from_slice(&data[12..20]);

        Ok(EncapHeader {
            command: Command::from(LittleEndian::read_u16(&data[0..2])),
            length: LittleEndian::read_u16(&data[2..4]),
            session_handle: LittleEndian::read_u32(&data[4..8]),
            status: LittleEndian::read_u32(&data[8..12]),
            sender_context,
            options: LittleEndian::read_u32(&data[20..24]),
        })
    }

    pub fn encode(&self, out: &mut [u8; HEADER_LENGTH]) {
        LittleEndian::write_u16(&mut out[0..2], self.command.into());
        LittleEndian::write_u16(&mut out[2..4], self.length);
        LittleEndian::write_u32(&mut out[4..8], self.session_handle);
        LittleEndian::write_u32(&mut out[8..12], self.status);
        out[12..20].copy_from_slice(&self.sender_context);
        LittleEndian::write_u32(&mut out[20..24], self.options);
    }

    /// Build the header for a reply that mirrors the request's session handle and sender context.
    pub fn reply_to(request: &EncapHeader, status: EncapsulationStatus, payload_length: u16) -> EncapHeader {
        EncapHeader {
            command: request.command,
            length: payload_length,
            session_handle: request.session_handle,
            status: status as u32,
            sender_context: request.sender_context,
            options: 0,
        }
    }
}

/// The C5 seam: given a decoded header and its payload, produce the bytes of a reply (header
/// included). Concrete commands (list identity, register/unregister session, forward to the
/// message router) are implemented by whoever plugs in here — this crate only owns framing.
///
/// `active_connection` is the originating TCP connection, when there is one (§9: threaded
/// explicitly from the event loop rather than consulted from ambient state; `None` for requests
/// arriving over the connectionless UDP broadcast listener).
pub trait EncapsulationHandler {
    fn handle(&mut self, header: &EncapHeader, payload: &[u8], active_connection: Option<ConnectionToken>) -> Vec<u8>;
}
