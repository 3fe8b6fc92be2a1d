//! The class registry (C1): an insertion-ordered, O(1)-lookup map from class id to `Class`,
//! replacing the original's `g_first_object` singly-linked list (`GetRegisteredObject`,
//! `RegisterClass`, `DeleteAllClasses` in `cipmessagerouter.c`).

use indexmap::IndexMap;

use cip_support::logging::{debug, info, warn, Logger};

use crate::class::Class;
use crate::error::RegistryError;

/// Owns every registered class. Lives inside the `Router`, not behind a global — see the §9
/// redesign note on eliminating ambient singletons.
pub struct Registry {
    classes: IndexMap<u32, Class>,
    logger: Logger,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::with_logger(cip_support::logging::discard())
    }

    pub fn with_logger(logger: Logger) -> Registry {
        Registry {
            classes: IndexMap::new(),
            logger,
        }
    }

    /// C1.1: register a class. Fails if `class_id` is already taken — the original silently let
    /// callers clobber each other; `cipmessagerouter.c`'s `RegisterClass` is in fact the only
    /// place that could enforce this, and didn't.
    pub fn register(&mut self, class: Class) -> Result<(), RegistryError> {
        let class_id = class.class_id();
        if self.classes.contains_key(&class_id) {
            warn!(self.logger, "duplicate class registration rejected"; "class_id" => class_id);
            return Err(RegistryError::Duplicate(class_id));
        }
        debug!(self.logger, "class registered"; "class_id" => class_id, "name" => %class.data.name);
        self.classes.insert(class_id, class);
        Ok(())
    }

    /// C1.3: find a registered class by id.
    pub fn lookup(&self, class_id: u32) -> Option<&Class> {
        self.classes.get(&class_id)
    }

    pub fn lookup_mut(&mut self, class_id: u32) -> Option<&mut Class> {
        self.classes.get_mut(&class_id)
    }

    /// C1.5: drop every registered class, mirroring `DeleteAllClasses`'s teardown-on-shutdown
    /// behavior.
    pub fn teardown(&mut self) {
        info!(self.logger, "registry teardown"; "class_count" => self.classes.len());
        self.classes.clear();
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}
