//! Reference, thin implementations of the concrete CIP objects the core dispatch machinery treats
//! as pluggable collaborators: Identity, the self-registering Message Router, and an
//! `EncapsulationHandler` wiring session commands through to the message router.

pub mod handler;
pub mod identity;
pub mod message_router;

pub use handler::DeviceHandler;
pub use identity::{identity_class, IdentityConfig};
pub use message_router::{message_router_class, MESSAGE_ROUTER_CLASS_ID};
