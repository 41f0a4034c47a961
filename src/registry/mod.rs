//! # Service registry: process-wide name → singleton handle map.
//!
//! The registry replaces the ambient get-or-create globals of ad-hoc module
//! systems with explicit, injected references: a service is constructed once
//! during boot, registered under its name, and every consumer borrows the
//! same [`ServiceHandle`] from here.
//!
//! ## Rules
//! - `register` fails with [`RegistryError::Duplicate`] unless replacement
//!   is explicitly requested via `register_replacing`.
//! - `get` is idempotent: two calls for the same name return handles to the
//!   same instance.
//! - `get_or_register_with` never constructs twice — the init closure runs
//!   under the write lock, so concurrent callers observe one instance.
//! - `all()` returns a snapshot in **registration order** (stable, used by
//!   status reporting); replacement keeps the original slot.
//!
//! Access is safe under concurrent get/register: boot steps register while
//! already-running services look their dependencies up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::RegistryError;
use crate::services::ServiceRef;

/// How the runtime treats a registered service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    /// Exposes only data/methods; no run loop to manage.
    Passive,
    /// Owns a run loop started and joined by the lifecycle manager.
    Background,
}

/// Handle to a registered service.
///
/// Owned exclusively by the registry; everything else holds clones of this
/// handle (cheap: two `Arc`s and a tag), never the instance itself.
#[derive(Clone)]
pub struct ServiceHandle {
    /// Registered name.
    pub name: Arc<str>,
    /// Passive or Background.
    pub kind: ServiceKind,
    /// The shared service instance.
    pub instance: ServiceRef,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Inner {
    /// Registration order; replacement keeps the original slot.
    order: Vec<ServiceHandle>,
    /// Name → index into `order`.
    index: HashMap<Arc<str>, usize>,
}

/// Process-wide map from service name to singleton instance.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: RwLock<Inner>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, failing on a duplicate name.
    pub fn register(
        &self,
        name: impl Into<Arc<str>>,
        instance: ServiceRef,
        kind: ServiceKind,
    ) -> Result<ServiceHandle, RegistryError> {
        let name = name.into();
        let mut inner = self.inner.write().unwrap();
        if inner.index.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }
        let handle = ServiceHandle {
            name: Arc::clone(&name),
            kind,
            instance,
        };
        let slot = inner.order.len();
        inner.order.push(handle.clone());
        inner.index.insert(name, slot);
        Ok(handle)
    }

    /// Registers a service, replacing any existing entry with the same name.
    ///
    /// The replaced entry keeps its registration-order slot.
    pub fn register_replacing(
        &self,
        name: impl Into<Arc<str>>,
        instance: ServiceRef,
        kind: ServiceKind,
    ) -> ServiceHandle {
        let name = name.into();
        let mut inner = self.inner.write().unwrap();
        let handle = ServiceHandle {
            name: Arc::clone(&name),
            kind,
            instance,
        };
        match inner.index.get(&name).copied() {
            Some(slot) => inner.order[slot] = handle.clone(),
            None => {
                let slot = inner.order.len();
                inner.order.push(handle.clone());
                inner.index.insert(name, slot);
            }
        }
        handle
    }

    /// Returns the handle for `name`, or [`RegistryError::NotFound`].
    pub fn get(&self, name: &str) -> Result<ServiceHandle, RegistryError> {
        let inner = self.inner.read().unwrap();
        inner
            .index
            .get(name)
            .map(|&slot| inner.order[slot].clone())
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Returns the handle for `name` if present.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ServiceHandle> {
        self.get(name).ok()
    }

    /// Returns the existing handle for `name`, or constructs and registers
    /// one via `init`.
    ///
    /// `init` runs under the write lock, so repeated and concurrent calls
    /// construct exactly one instance.
    pub fn get_or_register_with(
        &self,
        name: impl Into<Arc<str>>,
        kind: ServiceKind,
        init: impl FnOnce() -> ServiceRef,
    ) -> ServiceHandle {
        let name = name.into();
        let mut inner = self.inner.write().unwrap();
        if let Some(&slot) = inner.index.get(&name) {
            return inner.order[slot].clone();
        }
        let handle = ServiceHandle {
            name: Arc::clone(&name),
            kind,
            instance: init(),
        };
        let slot = inner.order.len();
        inner.order.push(handle.clone());
        inner.index.insert(name, slot);
        handle
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().unwrap().index.contains_key(name)
    }

    /// Returns a stable snapshot of all handles in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<ServiceHandle> {
        self.inner.read().unwrap().order.clone()
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }

    /// True if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn passive(name: &'static str) -> ServiceRef {
        ServiceFn::arc(name, |_ctx| async { Ok(()) })
    }

    #[test]
    fn duplicate_register_fails() {
        let reg = ServiceRegistry::new();
        reg.register("vision", passive("vision"), ServiceKind::Passive)
            .unwrap();
        let err = reg
            .register("vision", passive("vision"), ServiceKind::Passive)
            .unwrap_err();
        assert_eq!(err.as_label(), "registry_duplicate");
    }

    #[test]
    fn get_unknown_fails() {
        let reg = ServiceRegistry::new();
        let err = reg.get("nope").unwrap_err();
        assert_eq!(err.as_label(), "registry_not_found");
    }

    #[test]
    fn get_is_idempotent_same_instance() {
        let reg = ServiceRegistry::new();
        reg.register("memory", passive("memory"), ServiceKind::Passive)
            .unwrap();
        let a = reg.get("memory").unwrap();
        let b = reg.get("memory").unwrap();
        assert!(Arc::ptr_eq(&a.instance, &b.instance));
    }

    #[test]
    fn get_or_register_constructs_once() {
        let reg = ServiceRegistry::new();
        let constructed = AtomicUsize::new(0);
        for _ in 0..3 {
            reg.get_or_register_with("emotion", ServiceKind::Passive, || {
                constructed.fetch_add(1, Ordering::SeqCst);
                passive("emotion")
            });
        }
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn all_preserves_registration_order() {
        let reg = ServiceRegistry::new();
        for name in ["bus", "dna", "brainstem"] {
            reg.register(name, passive("x"), ServiceKind::Passive)
                .unwrap();
        }
        let names: Vec<_> = reg.all().iter().map(|h| h.name.to_string()).collect();
        assert_eq!(names, ["bus", "dna", "brainstem"]);
    }

    #[test]
    fn replace_keeps_order_slot() {
        let reg = ServiceRegistry::new();
        reg.register("a", passive("a"), ServiceKind::Passive).unwrap();
        reg.register("b", passive("b"), ServiceKind::Passive).unwrap();
        reg.register_replacing("a", passive("a2"), ServiceKind::Background);

        let all = reg.all();
        assert_eq!(all[0].name.as_ref(), "a");
        assert_eq!(all[0].kind, ServiceKind::Background);
        assert_eq!(all.len(), 2);
    }
}
