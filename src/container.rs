//! Service container and the resolver contract the mediator depends on.
//!
//! The builder only talks to a [`Resolver`]: "give me the service(s)
//! registered under this key". [`Container`] is the in-process
//! implementation handed to [`MediatorBuilder::new`](crate::MediatorBuilder::new);
//! callers may pre-register their own dependencies (database pools,
//! validators, ...) before building.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mediator_builder::{Container, ResolverExt};
//!
//! struct Clock(u64);
//!
//! let mut container = Container::new();
//! container.register(Clock(7));
//!
//! let clock: Arc<Clock> = container.require().unwrap();
//! assert_eq!(clock.0, 7);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MediatorError, Result};

/// A registered service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Key a service is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// Plain service, keyed by its own type.
    Type(TypeId),
    /// Composed handler chain for a request type.
    Request(TypeId),
    /// Subscribers of a notification (or notification view) type.
    Notification(TypeId),
}

impl ServiceKey {
    /// Key of a plain service of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey::Type(TypeId::of::<T>())
    }

    /// Key of the handler chain for request type `R`.
    pub fn request<R: ?Sized + 'static>() -> Self {
        ServiceKey::Request(TypeId::of::<R>())
    }

    /// Key of the subscribers for notification type `N`.
    pub fn notification<N: ?Sized + 'static>() -> Self {
        ServiceKey::Notification(TypeId::of::<N>())
    }
}

/// Resolution contract used by the builder and the mediator.
pub trait Resolver: Send + Sync {
    /// Resolve the most recently registered service under `key`.
    fn resolve(&self, key: ServiceKey) -> Option<Service>;

    /// Resolve every service registered under `key`, in registration order.
    fn resolve_all(&self, key: ServiceKey) -> Vec<Service>;
}

/// Typed helpers over any [`Resolver`].
pub trait ResolverExt: Resolver {
    /// Resolve a plain service of type `T`.
    fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resolve(ServiceKey::of::<T>())
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Resolve a plain service of type `T` or fail with `MissingService`.
    fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.get::<T>()
            .ok_or(MediatorError::MissingService(std::any::type_name::<T>()))
    }

    /// Resolve every plain service of type `T`.
    fn get_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.resolve_all(ServiceKey::of::<T>())
            .into_iter()
            .filter_map(|service| service.downcast::<T>().ok())
            .collect()
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

/// Multi-binding service container.
#[derive(Default)]
pub struct Container {
    services: HashMap<ServiceKey, Vec<Service>>,
}

impl Container {
    /// Create a new empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service instance under its own type.
    ///
    /// Registering the same type again adds another binding; `get` returns
    /// the latest, `get_all` returns every binding.
    pub fn register<T: Any + Send + Sync>(&mut self, instance: T) -> &mut Self {
        self.register_arc(Arc::new(instance))
    }

    /// Register a shared service instance under its own type.
    pub fn register_arc<T: Any + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        self.insert(ServiceKey::of::<T>(), instance);
        self
    }

    /// Register a service under an explicit key.
    pub(crate) fn insert(&mut self, key: ServiceKey, service: Service) {
        self.services.entry(key).or_default().push(service);
    }

    /// Check if anything is registered under `key`.
    pub fn contains(&self, key: ServiceKey) -> bool {
        self.services.get(&key).is_some_and(|s| !s.is_empty())
    }

    /// Number of keys with at least one binding.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Resolver for Container {
    fn resolve(&self, key: ServiceKey) -> Option<Service> {
        self.services.get(&key).and_then(|s| s.last().cloned())
    }

    fn resolve_all(&self, key: ServiceKey) -> Vec<Service> {
        self.services.get(&key).cloned().unwrap_or_default()
    }
}
