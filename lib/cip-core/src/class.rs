//! The object model (§3): `Class`, `Instance`, the meta-class companion, and the `CipObject`
//! polymorphism seam that concrete pluggable objects (Identity, Assembly, …) implement.
//!
//! Concrete object semantics (what an attribute means, what a service does) are out of scope for
//! this crate — see `cip-objects` — but the generic bookkeeping (instance list, meta-class, the
//! `notify` dispatch point) lives here because the router needs to walk it regardless of which
//! concrete object is plugged in.

use cip_support::logging::Logger;

use crate::request::{Request, Response};

/// Opaque per-instance attribute storage. Concrete objects interpret the bytes; the core never
/// does.
pub type AttributeValue = Vec<u8>;

/// One instance of a `Class`. Instances never store a backpointer to their owning `Class` — they
/// only ever exist inside `ClassData::instances`, so the "instance's class backpointer matches its
/// owner" invariant (§3) holds by construction rather than by a runtime check.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    pub instance_number: u32,
    pub attributes: Vec<AttributeValue>,
}

/// The meta-class companion (§3): describes class-level attributes of the `Class` it belongs to.
#[derive(Debug, Clone, Default)]
pub struct MetaClass {
    pub name: String,
    pub attributes: Vec<AttributeValue>,
}

/// The generic, core-owned bookkeeping for one registered class: identity, revision, its ordered
/// instance list, and its meta-class companion. Handed to the plugged-in `CipObject` on every
/// `notify` call so it can look up and mutate instances without needing its own duplicate
/// bookkeeping.
pub struct ClassData {
    pub class_id: u32,
    pub name: String,
    pub revision: u16,
    pub instances: Vec<Instance>,
    pub meta: MetaClass,
}

impl ClassData {
    pub fn new(class_id: u32, name: impl Into<String>, revision: u16) -> ClassData {
        let name = name.into();
        ClassData {
            class_id,
            meta: MetaClass {
                name: format!("meta-{}", name),
                attributes: Vec::new(),
            },
            name,
            revision,
            instances: Vec::new(),
        }
    }

    /// Append a new instance and return it. Instances are insertion-ordered and never removed
    /// except by full teardown (§3 Lifecycle).
    pub fn add_instance(&mut self, instance_number: u32) -> &mut Instance {
        self.instances.push(Instance {
            instance_number,
            attributes: Vec::new(),
        });
        self.instances.last_mut().expect("just pushed")
    }

    /// C1.2: resolve an instance id. `0` denotes the class object itself.
    pub fn get_instance(&self, instance_id: u32) -> Option<InstanceRef<'_>> {
        if instance_id == 0 {
            return Some(InstanceRef::ClassItself);
        }
        self.instances
            .iter()
            .find(|instance| instance.instance_number == instance_id)
            .map(InstanceRef::Instance)
    }

    pub fn get_instance_mut(&mut self, instance_id: u32) -> Option<InstanceRefMut<'_>> {
        if instance_id == 0 {
            return Some(InstanceRefMut::ClassItself);
        }
        self.instances
            .iter_mut()
            .find(|instance| instance.instance_number == instance_id)
            .map(InstanceRefMut::Instance)
    }
}

#[derive(Debug)]
pub enum InstanceRef<'a> {
    ClassItself,
    Instance(&'a Instance),
}

#[derive(Debug)]
pub enum InstanceRefMut<'a> {
    ClassItself,
    Instance(&'a mut Instance),
}

/// The outcome of a `notify` call, propagated unchanged from the concrete object up through the
/// router (§4.4 step 4).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DispatchOutcome {
    OkReplied,
    OkNoReply,
    Error,
}

/// Identifies the TCP connection a request arrived on, threaded explicitly through `notify` so a
/// service handler that needs to open a peer-to-peer UDP socket (§4.11) knows which peer without
/// consulting ambient/global state (§9 redesign).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ConnectionToken(pub usize);

/// The polymorphism seam (§9 "Polymorphism over objects"): every registered class plugs in a
/// concrete implementation of this trait. The registry stores these behind `Box<dyn CipObject>`.
pub trait CipObject {
    fn notify(
        &mut self,
        class: &mut ClassData,
        request: &Request<'_>,
        response: &mut Response,
        active_connection: Option<ConnectionToken>,
        logger: &Logger,
    ) -> DispatchOutcome;
}

/// A registered class: its generic bookkeeping plus the concrete object implementing `notify`.
pub struct Class {
    pub data: ClassData,
    object: Box<dyn CipObject>,
}

impl Class {
    pub fn new(class_id: u32, name: impl Into<String>, revision: u16, object: Box<dyn CipObject>) -> Class {
        Class {
            data: ClassData::new(class_id, name, revision),
            object,
        }
    }

    #[inline]
    pub fn class_id(&self) -> u32 {
        self.data.class_id
    }

    #[inline]
    pub fn notify(
        &mut self,
        request: &Request<'_>,
        response: &mut Response,
        active_connection: Option<ConnectionToken>,
        logger: &Logger,
    ) -> DispatchOutcome {
        self.object.notify(&mut self.data, request, response, active_connection, logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    impl CipObject for Stub {
        fn notify(
            &mut self,
            _class: &mut ClassData,
            request: &Request<'_>,
            response: &mut Response,
            _active_connection: Option<ConnectionToken>,
            _logger: &Logger,
        ) -> DispatchOutcome {
            response.reply_service = request.service | 0x80;
            response.general_status = 0;
            assert!(response.set_data(&[0xDE, 0xAD, 0xBE, 0xEF]));
            DispatchOutcome::OkReplied
        }
    }

    #[test]
    fn class_as_instance_zero_always_resolves() {
        let class = ClassData::new(1, "stub", 1);

        assert!(matches!(class.get_instance(0), Some(InstanceRef::ClassItself)));
        assert!(class.get_instance(1).is_none());
    }

    #[test]
    fn added_instances_are_found_by_number() {
        let mut class = ClassData::new(1, "stub", 1);
        class.add_instance(1);
        class.add_instance(2);

        assert!(matches!(class.get_instance(2), Some(InstanceRef::Instance(_))));
        assert!(class.get_instance(3).is_none());
    }

    #[test]
    fn notify_delegates_to_the_plugged_in_object() {
        use crate::request::parse;

        let mut class = Class::new(1, "stub", 1, Box::new(Stub));
        let data = [0x0E, 0x02, 0x20, 0x01, 0x24, 0x01];
        let request = parse(&data).unwrap();
        let mut response = Response::new();

        let outcome = class.notify(&request, &mut response, None, &cip_support::logging::discard());

        assert_eq!(outcome, DispatchOutcome::OkReplied);
        assert_eq!(response.reply_service, 0x8E);
        assert_eq!(response.data(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
