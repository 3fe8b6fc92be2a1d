//! A reference `EncapsulationHandler` (C5) wiring the three session-level commands to the
//! message router: `RegisterSession` hands out a session handle, `UnRegisterSession` retires one,
//! and `SendRRData`/`SendUnitData` unwrap a Common Packet Format envelope down to the embedded
//! CIP request and forward it to `Router::notify`.
//!
//! CPF item parsing here only handles the single-unconnected-data-item shape real clients send
//! for explicit messaging; a fuller implementation would walk the item count instead of assuming
//! it. That's a deliberate scope line for this reference object, not a core-library limitation.

use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexSet;

use cip_core::{ConnectionToken, DispatchOutcome, Router};
use cip_net::encapsulation::{Command, EncapHeader, EncapsulationHandler, EncapsulationStatus, HEADER_LENGTH};

use crate::identity::IdentityConfig;

/// Bytes preceding the CIP request inside a `SendRRData`/`SendUnitData` CPF envelope: interface
/// handle (4) + timeout (2) + item count (2) + null address item (4) + unconnected data item
/// header (4).
const CPF_PREFIX_LENGTH: usize = 16;

/// List Identity Response item type (CPF item 0x000C) carried in the `ListIdentity` reply.
const LIST_IDENTITY_ITEM_TYPE: u16 = 0x000C;

pub struct DeviceHandler {
    router: Router,
    identity: IdentityConfig,
    sessions: IndexSet<u32>,
    next_session: u32,
}

impl DeviceHandler {
    pub fn new(router: Router, identity: IdentityConfig) -> DeviceHandler {
        DeviceHandler {
            router,
            identity,
            sessions: IndexSet::new(),
            next_session: 1,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    fn register_session(&mut self, header: &EncapHeader) -> Vec<u8> {
        let handle = self.next_session;
        self.next_session += 1;
        self.sessions.insert(handle);

        let mut reply = EncapHeader::reply_to(header, EncapsulationStatus::Success, 4);
        reply.session_handle = handle;

        let mut body = [0u8; 4];
        LittleEndian::write_u16(&mut body[0..2], 1); // protocol version
        encode(&reply, &body)
    }

    fn unregister_session(&mut self, header: &EncapHeader) -> Vec<u8> {
        self.sessions.shift_remove(&header.session_handle);
        let reply = EncapHeader::reply_to(header, EncapsulationStatus::Success, 0);
        encode(&reply, &[])
    }

    fn send_data(&mut self, header: &EncapHeader, payload: &[u8], active_connection: Option<ConnectionToken>) -> Vec<u8> {
        if !self.sessions.contains(&header.session_handle) {
            let reply = EncapHeader::reply_to(header, EncapsulationStatus::InvalidSessionHandle, 0);
            return encode(&reply, &[]);
        }

        if payload.len() <= CPF_PREFIX_LENGTH {
            let reply = EncapHeader::reply_to(header, EncapsulationStatus::IncorrectData, 0);
            return encode(&reply, &[]);
        }

        let cip_request = &payload[CPF_PREFIX_LENGTH..];
        let outcome = self.router.notify(cip_request, active_connection);

        // `OkNoReply` means the class handled the request but has nothing to say back on the
        // wire (e.g. a connected producer sending its first tick) — answer with an empty CIP
        // body rather than echoing whatever the response buffer happened to hold last.
        if outcome == DispatchOutcome::OkNoReply {
            let reply = EncapHeader::reply_to(header, EncapsulationStatus::Success, 0);
            return encode(&reply, &[]);
        }

        let response = self.router.response();
        let mut body = Vec::new();
        body.extend_from_slice(&[0, 0]); // interface handle (low word, reply doesn't echo timeout)
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&2u16.to_le_bytes()); // item count: address + data
        body.extend_from_slice(&0u16.to_le_bytes()); // null address item type
        body.extend_from_slice(&0u16.to_le_bytes()); // null address item length
        body.extend_from_slice(&0xB2u16.to_le_bytes()); // unconnected data item type
        let response_len = 2 + response.data().len();
        body.extend_from_slice(&(response_len as u16).to_le_bytes());
        body.push(response.reply_service);
        body.push(response.general_status);
        body.extend_from_slice(response.data());

        let reply = EncapHeader::reply_to(header, EncapsulationStatus::Success, body.len() as u16);
        encode(&reply, &body)
    }

    /// Build a `ListIdentity` reply item (CPF item 0x000C) reporting the configured identity
    /// attributes. The socket address struct's port/address are left zeroed: this reference
    /// handler isn't handed the device's own bound TCP address, only its identity config.
    fn list_identity(&self, header: &EncapHeader) -> Vec<u8> {
        let mut item = Vec::new();
        item.extend_from_slice(&1u16.to_le_bytes()); // encapsulation protocol version
        item.extend_from_slice(&2u16.to_be_bytes()); // sin_family = AF_INET
        item.extend_from_slice(&0u16.to_be_bytes()); // sin_port
        item.extend_from_slice(&[0u8; 4]); // sin_addr
        item.extend_from_slice(&[0u8; 8]); // sin_zero
        item.extend_from_slice(&self.identity.vendor_id.to_le_bytes());
        item.extend_from_slice(&self.identity.device_type.to_le_bytes());
        item.extend_from_slice(&self.identity.product_code.to_le_bytes());
        item.push(self.identity.revision.0);
        item.push(self.identity.revision.1);
        item.extend_from_slice(&0u16.to_le_bytes()); // status
        item.extend_from_slice(&self.identity.serial_number.to_le_bytes());
        let name = self.identity.product_name.as_bytes();
        item.push(name.len() as u8);
        item.extend_from_slice(name);
        item.push(0xFF); // state: not tracked by this reference stack

        let mut body = Vec::new();
        body.extend_from_slice(&1u16.to_le_bytes()); // item count
        body.extend_from_slice(&LIST_IDENTITY_ITEM_TYPE.to_le_bytes());
        body.extend_from_slice(&(item.len() as u16).to_le_bytes());
        body.extend_from_slice(&item);

        let reply = EncapHeader::reply_to(header, EncapsulationStatus::Success, body.len() as u16);
        encode(&reply, &body)
    }
}

fn encode(header: &EncapHeader, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_LENGTH];
    header.encode((&mut bytes[..HEADER_LENGTH]).try_into().expect("fixed-size header"));
    bytes.extend_from_slice(payload);
    bytes
}

impl EncapsulationHandler for DeviceHandler {
    fn handle(&mut self, header: &EncapHeader, payload: &[u8], active_connection: Option<ConnectionToken>) -> Vec<u8> {
        match header.command {
            Command::RegisterSession => self.register_session(header),
            Command::UnRegisterSession => self.unregister_session(header),
            Command::SendRrData | Command::SendUnitData => self.send_data(header, payload, active_connection),
            Command::ListIdentity => self.list_identity(header),
            _ => encode(&EncapHeader::reply_to(header, EncapsulationStatus::InvalidCommand, 0), &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::identity_class;

    fn register(handler: &mut DeviceHandler) -> u32 {
        let header = EncapHeader {
            command: Command::RegisterSession,
            length: 4,
            session_handle: 0,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };
        let reply = handler.handle(&header, &[1, 0, 0, 0], None);
        let decoded = EncapHeader::decode(&reply).unwrap();
        decoded.session_handle
    }

    #[test]
    fn register_session_hands_out_increasing_handles() {
        let mut handler = DeviceHandler::new(Router::new(), IdentityConfig::default());

        let first = register(&mut handler);
        let second = register(&mut handler);

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn send_rr_data_without_a_session_is_rejected() {
        let mut handler = DeviceHandler::new(Router::new(), IdentityConfig::default());
        let header = EncapHeader {
            command: Command::SendRrData,
            length: 0,
            session_handle: 999,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };

        let reply = handler.handle(&header, &[0u8; CPF_PREFIX_LENGTH + 4], None);
        let decoded = EncapHeader::decode(&reply).unwrap();

        assert_eq!(decoded.status, EncapsulationStatus::InvalidSessionHandle as u32);
    }

    #[test]
    fn send_rr_data_forwards_to_the_router() {
        let mut router = Router::new();
        router.registry_mut().register(identity_class(Default::default())).unwrap();
        let mut handler = DeviceHandler::new(router, IdentityConfig::default());

        let session = register(&mut handler);

        let mut cpf = vec![0u8; CPF_PREFIX_LENGTH];
        // service=0x0E, word_count=2, class=0x01, instance=0x01, attribute=0x01
        cpf.extend_from_slice(&[0x0E, 0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x01]);

        let header = EncapHeader {
            command: Command::SendRrData,
            length: cpf.len() as u16,
            session_handle: session,
            status: 0,
            sender_context: [0; 8],
            options: 0,
        };

        let reply = handler.handle(&header, &cpf, None);
        let decoded = EncapHeader::decode(&reply).unwrap();

        assert_eq!(decoded.status, EncapsulationStatus::Success as u32);
        // body tail is [reply_service, general_status, data...]; data is the 2-byte vendor id.
        assert_eq!(reply[reply.len() - 4], 0x8E);
    }

    #[test]
    fn list_identity_reports_configured_attributes() {
        let mut handler = DeviceHandler::new(
            Router::new(),
            IdentityConfig {
                vendor_id: 0x1234,
                product_name: String::from("test-device"),
                ..Default::default()
            },
        );
        let header = EncapHeader {
            command: Command::ListIdentity,
            length: 0,
            session_handle: 0,
            status: 0,
            sender_context: [7; 8],
            options: 0,
        };

        let reply = handler.handle(&header, &[], None);
        let decoded = EncapHeader::decode(&reply).unwrap();

        assert_eq!(decoded.status, EncapsulationStatus::Success as u32);
        assert_eq!(decoded.sender_context, [7; 8]);
        let body = &reply[HEADER_LENGTH..];
        assert_eq!(&body[0..2], &1u16.to_le_bytes()); // item count
        assert_eq!(&body[2..4], &LIST_IDENTITY_ITEM_TYPE.to_le_bytes());
        assert!(body.windows(11).any(|w| w == b"test-device"));
    }
}
