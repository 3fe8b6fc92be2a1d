//! The CIP object model and message dispatch core: electronic paths, request/response framing,
//! the class registry, and the message router.

pub mod class;
pub mod epath;
pub mod error;
pub mod registry;
pub mod request;
pub mod router;

pub use class::{CipObject, Class, ClassData, ConnectionToken, DispatchOutcome, Instance};
pub use epath::EPath;
pub use error::{CipError, GeneralStatus, PathError, RegistryError};
pub use registry::Registry;
pub use request::{Request, Response};
pub use router::Router;
