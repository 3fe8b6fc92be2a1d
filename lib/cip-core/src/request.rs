//! Request parsing (C3) and the `Request`/`Response` data model (§3).

use crate::epath::{self, EPath};
use crate::error::CipError;

/// A parsed CIP request. `payload` borrows from the buffer the caller owns; a `Request` never
/// outlives the bytes it was parsed from.
#[derive(Debug, Copy, Clone)]
pub struct Request<'a> {
    pub service: u8,
    pub path: EPath,
    pub payload: &'a [u8],
}

/// Parse `service(1) | word_count(1) | path(2*word_count) | payload(...)` into a `Request`.
pub fn parse(data: &[u8]) -> Result<Request<'_>, CipError> {
    if data.is_empty() {
        return Err(CipError::PathSizeInvalid);
    }

    let service = data[0];
    let rest = &data[1..];

    let (path, consumed) = epath::decode(rest)?;

    let payload = &rest[consumed..];

    Ok(Request { service, path, payload })
}

/// Response buffer size, mirroring the original's "fixed buffer of about 100 bytes".
pub const RESPONSE_BUFFER_SIZE: usize = 128;

/// The reply to a request. `data` is backed by a fixed-size buffer owned by the `Router` so no
/// allocation happens on the hot path; `data_length` says how much of it is valid.
pub struct Response {
    pub reply_service: u8,
    pub general_status: u8,
    pub size_of_additional_status: u8,
    pub reserved: u8,
    pub data: [u8; RESPONSE_BUFFER_SIZE],
    pub data_length: u16,
}

impl Response {
    #[inline]
    pub fn new() -> Response {
        Response {
            reply_service: 0,
            general_status: 0,
            size_of_additional_status: 0,
            reserved: 0,
            data: [0; RESPONSE_BUFFER_SIZE],
            data_length: 0,
        }
    }

    /// Reset the response to a blank slate before processing the next message (§3 lifecycle:
    /// "its pointer is reset to the reply buffer on every inbound message").
    #[inline]
    pub fn reset(&mut self) {
        self.reply_service = 0;
        self.general_status = 0;
        self.size_of_additional_status = 0;
        self.reserved = 0;
        self.data_length = 0;
    }

    /// Write an error reply: mirrors the request's service with the high bit set, a given status,
    /// and no data (§4.4 steps 2-3).
    #[inline]
    pub fn error(&mut self, request_service: u8, general_status: u8) {
        self.reply_service = request_service | 0x80;
        self.general_status = general_status;
        self.size_of_additional_status = 0;
        self.data_length = 0;
    }

    /// Copy `bytes` into the response data buffer and set `data_length` accordingly. Returns
    /// `false` (and leaves the response untouched) if `bytes` doesn't fit.
    #[inline]
    #[must_use]
    pub fn set_data(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.data.len() {
            return false;
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.data_length = bytes.len() as u16;
        true
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_length as usize]
    }
}

impl Default for Response {
    fn default() -> Response {
        Response::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_path_and_payload() {
        // service=0x0E, word_count=2, class=0x01, instance=0x01, payload=[0xAA, 0xBB]
        let data = [0x0E, 0x02, 0x20, 0x01, 0x24, 0x01, 0xAA, 0xBB];

        let request = parse(&data).unwrap();

        assert_eq!(request.service, 0x0E);
        assert_eq!(request.path.class_id, Some(0x01));
        assert_eq!(request.path.instance_number, Some(0x01));
        assert_eq!(request.payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn empty_payload_is_fine() {
        let data = [0x0E, 0x02, 0x20, 0x01, 0x24, 0x01];

        let request = parse(&data).unwrap();

        assert!(request.payload.is_empty());
    }

    #[test]
    fn malformed_path_surfaces_path_segment_error() {
        let data = [0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFF];

        let err = parse(&data).unwrap_err();

        assert_eq!(err, CipError::PathSegmentError);
    }

    #[test]
    fn response_error_mirrors_service_with_high_bit() {
        let mut response = Response::new();

        response.error(0x0E, 0x05);

        assert_eq!(response.reply_service, 0x8E);
        assert_eq!(response.general_status, 0x05);
        assert_eq!(response.data_length, 0);
    }

    #[test]
    fn response_reset_clears_prior_data() {
        let mut response = Response::new();
        assert!(response.set_data(&[1, 2, 3]));
        response.reply_service = 0x8E;

        response.reset();

        assert_eq!(response.data_length, 0);
        assert_eq!(response.reply_service, 0);
    }

    #[test]
    fn set_data_rejects_oversized_payload() {
        let mut response = Response::new();
        let too_big = vec![0u8; RESPONSE_BUFFER_SIZE + 1];

        assert!(!response.set_data(&too_big));
        assert_eq!(response.data_length, 0);
    }
}
