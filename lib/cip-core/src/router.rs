//! The message router (C4): parse, resolve the destination class, dispatch. Grounded on
//! `NotifyMR` in `cipmessagerouter.c`, generalized over the registry's trait objects rather than
//! `NotifyMR`'s raw `if (class_id == kCipMessageRouterClassCode) ... else ...` chain.

use cip_support::logging::{trace, warn, Logger};

use crate::class::{Class, ConnectionToken, DispatchOutcome};
use crate::registry::Registry;
use crate::request::{self, Response};

/// Owns the class registry and the single reusable response buffer (§9: one owned `Router` value
/// instead of ambient globals for "the" registry and "the" response buffer).
pub struct Router {
    registry: Registry,
    response: Response,
    logger: Logger,
}

impl Router {
    pub fn new() -> Router {
        Router::with_logger(cip_support::logging::discard())
    }

    pub fn with_logger(logger: Logger) -> Router {
        Router {
            registry: Registry::with_logger(logger.clone()),
            response: Response::new(),
            logger,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// C4: the full dispatch sequence for one inbound message.
    ///
    /// 1. reset the response buffer
    /// 2. parse the request (C3)
    /// 3. resolve the destination class by `path.class_id` (C1)
    /// 4. invoke the class's `notify`
    ///
    /// Returns the outcome and leaves the formatted reply in `self.response()`.
    ///
    /// A request that never reaches a class's `notify` (a parse failure, or a path naming a class
    /// nobody registered) is still an encapsulation-level success: the error is reported *inside*
    /// the CIP reply, not by failing to reply at all, mirroring `NotifyMR`'s `eip_status` in
    /// `cipmessagerouter.c`, which starts at `kEipStatusOkSend` and is only ever overwritten once
    /// `NotifyClass` actually runs.
    pub fn notify(&mut self, data: &[u8], active_connection: Option<ConnectionToken>) -> DispatchOutcome {
        self.response.reset();

        let parsed = match request::parse(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(self.logger, "request parse failed"; "general_status" => ?err.general_status());
                self.response.error(data.first().copied().unwrap_or(0), err.general_status().into());
                return DispatchOutcome::OkReplied;
            }
        };

        let class_id = match parsed.path.class_id {
            Some(class_id) => class_id,
            None => {
                warn!(self.logger, "request path has no class segment"; "service" => parsed.service);
                self.response.error(parsed.service, crate::error::GeneralStatus::PathSegmentError.into());
                return DispatchOutcome::OkReplied;
            }
        };

        let class: &mut Class = match self.registry.lookup_mut(class_id) {
            Some(class) => class,
            None => {
                warn!(self.logger, "unknown class requested"; "class_id" => class_id, "service" => parsed.service);
                self.response
                    .error(parsed.service, crate::error::GeneralStatus::PathDestinationUnknown.into());
                return DispatchOutcome::OkReplied;
            }
        };

        let outcome = class.notify(&parsed, &mut self.response, active_connection, &self.logger);
        trace!(self.logger, "dispatched request"; "class_id" => class_id, "service" => parsed.service, "outcome" => ?outcome);
        outcome
    }

    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl Default for Router {
    fn default() -> Router {
        Router::new()
    }
}
