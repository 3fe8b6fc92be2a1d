//! The Message Router registers itself as class `0x02` in its own registry, matching
//! `cipmessagerouter.c`'s `CreateMessageRouterClass`/`RegisterClass(&message_router_class)`. As a
//! plugged-in `CipObject` its own `notify` is rarely addressed directly — clients normally target
//! the class that actually owns the requested attribute — but registering it means
//! `get_instance(0x02, 0)` resolves the way every other class does, and `GetAttributeSingle` on
//! its sole attribute (the number of registered classes) answers a basic liveness probe.

use cip_core::{Class, CipObject, ClassData, ConnectionToken, DispatchOutcome, GeneralStatus, Request, Response};
use cip_support::logging::Logger;

const SERVICE_GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
const ATTRIBUTE_NUMBER_OF_CLASSES: u16 = 1;

pub struct MessageRouterObject {
    registered_class_count: u16,
}

impl MessageRouterObject {
    pub fn new(registered_class_count: u16) -> MessageRouterObject {
        MessageRouterObject { registered_class_count }
    }
}

impl CipObject for MessageRouterObject {
    fn notify(
        &mut self,
        _class: &mut ClassData,
        request: &Request<'_>,
        response: &mut Response,
        _active_connection: Option<ConnectionToken>,
        _logger: &Logger,
    ) -> DispatchOutcome {
        if request.service != SERVICE_GET_ATTRIBUTE_SINGLE || request.path.attribute_number != Some(ATTRIBUTE_NUMBER_OF_CLASSES) {
            response.error(request.service, GeneralStatus::PathSegmentError.into());
            return DispatchOutcome::Error;
        }

        response.set_data(&self.registered_class_count.to_le_bytes());
        response.reply_service = request.service | 0x80;
        response.general_status = GeneralStatus::Success.into();
        DispatchOutcome::OkReplied
    }
}

pub const MESSAGE_ROUTER_CLASS_ID: u32 = 0x02;

pub fn message_router_class(registered_class_count: u16) -> Class {
    let mut class = Class::new(
        MESSAGE_ROUTER_CLASS_ID,
        "message_router",
        1,
        Box::new(MessageRouterObject::new(registered_class_count)),
    );
    class.data.add_instance(1);
    class
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip_core::epath::EPath;

    #[test]
    fn reports_registered_class_count() {
        let mut class = message_router_class(3);
        let request = Request {
            service: SERVICE_GET_ATTRIBUTE_SINGLE,
            path: EPath {
                class_id: Some(MESSAGE_ROUTER_CLASS_ID),
                instance_number: Some(0),
                attribute_number: Some(1),
                connection_point: None,
            },
            payload: &[],
        };
        let mut response = Response::new();

        let outcome = class.notify(&request, &mut response, None, &cip_support::logging::discard());

        assert_eq!(outcome, DispatchOutcome::OkReplied);
        assert_eq!(response.data(), &[3, 0]);
    }
}
