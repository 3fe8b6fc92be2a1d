//! Non-blocking socket plumbing for a CIP/EtherNet-IP device: encapsulation framing, the TCP and
//! UDP handlers, the `mio`-based multiplexer, and the UDP socket factory.

pub mod buffer;
pub mod connection;
pub mod encapsulation;
pub mod event_loop;
pub mod periodic;
pub mod socket_factory;
pub mod tcp;
pub mod udp;

pub use buffer::Buffer;
pub use connection::{Connection, ConnectionList};
pub use encapsulation::{Command, EncapHeader, EncapsulationHandler, EncapsulationStatus};
pub use event_loop::EventLoop;
pub use periodic::PeriodicDriver;
