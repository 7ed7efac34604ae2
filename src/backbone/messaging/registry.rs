use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::{AppError, ErrorKind};

// ============================================================================
// Service Registry - cross-module capability lookup
// ============================================================================
//
// Modules publish capability interfaces under a typed key during boot and
// resolve the ones they depend on during their own init. Entries are never
// removed; the registry is shared read-only once boot completes.
//
// ============================================================================

/// Typed key naming a service published in the registry
pub struct ServiceKey<T: ?Sized> {
    name: &'static str,
    _service: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> ServiceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _service: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for ServiceKey<T> {}

impl<T: ?Sized> fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, key: ServiceKey<T>, service: Arc<T>) -> Result<(), AppError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.services.contains_key(key.name) {
            return Err(AppError::new(
                ErrorKind::DuplicateRegistration,
                format!("service already registered: {}", key.name),
            ));
        }
        self.services.insert(key.name, Box::new(service));
        tracing::debug!(service = key.name, "Registered service");
        Ok(())
    }

    pub fn resolve<T>(&self, key: ServiceKey<T>) -> Result<Arc<T>, AppError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = self.services.get(key.name).ok_or_else(|| {
            AppError::new(
                ErrorKind::ServiceNotFound,
                format!("service not found: {}", key.name),
            )
        })?;

        entry.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
            AppError::operation_failed(format!(
                "service {} is registered with a different type",
                key.name
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
