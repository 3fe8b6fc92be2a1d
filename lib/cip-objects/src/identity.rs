//! A reference Identity object (class `0x01`), the one concrete object every CIP device exposes
//! so `ListIdentity` has something to report. A thin illustration of plugging into `CipObject`,
//! not a claim to model the full Identity object attribute set.

use cip_core::{Class, CipObject, ClassData, ConnectionToken, DispatchOutcome, GeneralStatus, Request, Response};
use cip_support::logging::{trace, Logger};

const SERVICE_GET_ATTRIBUTE_SINGLE: u8 = 0x0E;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub vendor_id: u16,
    pub device_type: u16,
    pub product_code: u16,
    pub revision: (u8, u8),
    pub serial_number: u32,
    pub product_name: String,
}

impl Default for IdentityConfig {
    fn default() -> IdentityConfig {
        IdentityConfig {
            vendor_id: 0,
            device_type: 0,
            product_code: 0,
            revision: (1, 0),
            serial_number: 0,
            product_name: String::from("cip-device"),
        }
    }
}

pub struct IdentityObject {
    config: IdentityConfig,
}

impl IdentityObject {
    fn attribute(&self, attribute_number: u16) -> Option<Vec<u8>> {
        match attribute_number {
            1 => Some(self.config.vendor_id.to_le_bytes().to_vec()),
            2 => Some(self.config.device_type.to_le_bytes().to_vec()),
            3 => Some(self.config.product_code.to_le_bytes().to_vec()),
            4 => Some(vec![self.config.revision.0, self.config.revision.1]),
            6 => Some(self.config.serial_number.to_le_bytes().to_vec()),
            7 => {
                let name = self.config.product_name.as_bytes();
                let mut bytes = Vec::with_capacity(1 + name.len());
                bytes.push(name.len() as u8);
                bytes.extend_from_slice(name);
                Some(bytes)
            }
            _ => None,
        }
    }
}

impl CipObject for IdentityObject {
    fn notify(
        &mut self,
        _class: &mut ClassData,
        request: &Request<'_>,
        response: &mut Response,
        _active_connection: Option<ConnectionToken>,
        logger: &Logger,
    ) -> DispatchOutcome {
        if request.service != SERVICE_GET_ATTRIBUTE_SINGLE {
            response.error(request.service, GeneralStatus::PathSegmentError.into());
            return DispatchOutcome::Error;
        }

        let Some(attribute_number) = request.path.attribute_number else {
            response.error(request.service, GeneralStatus::PathSegmentError.into());
            return DispatchOutcome::Error;
        };

        match self.attribute(attribute_number) {
            Some(bytes) if response.set_data(&bytes) => {
                trace!(logger, "identity attribute read"; "attribute" => attribute_number);
                response.reply_service = request.service | 0x80;
                response.general_status = GeneralStatus::Success.into();
                DispatchOutcome::OkReplied
            }
            _ => {
                response.error(request.service, GeneralStatus::PathDestinationUnknown.into());
                DispatchOutcome::Error
            }
        }
    }
}

/// Build the Identity class (id `0x01`) with a single instance, ready for `Registry::register`.
pub fn identity_class(config: IdentityConfig) -> Class {
    let mut class = Class::new(0x01, "identity", 1, Box::new(IdentityObject { config }));
    class.data.add_instance(1);
    class
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip_core::epath::EPath;

    fn request_for(attribute_number: u16) -> Request<'static> {
        Request {
            service: SERVICE_GET_ATTRIBUTE_SINGLE,
            path: EPath {
                class_id: Some(0x01),
                instance_number: Some(1),
                attribute_number: Some(attribute_number),
                connection_point: None,
            },
            payload: &[],
        }
    }

    #[test]
    fn reports_vendor_id() {
        let mut class = identity_class(IdentityConfig {
            vendor_id: 0x1234,
            ..Default::default()
        });
        let mut response = Response::new();

        let outcome = class.notify(&request_for(1), &mut response, None, &cip_support::logging::discard());

        assert_eq!(outcome, DispatchOutcome::OkReplied);
        assert_eq!(response.data(), &[0x34, 0x12]);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let mut class = identity_class(IdentityConfig::default());
        let mut response = Response::new();

        let outcome = class.notify(&request_for(99), &mut response, None, &cip_support::logging::discard());

        assert_eq!(outcome, DispatchOutcome::Error);
    }
}
