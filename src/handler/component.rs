//! Handler type descriptors and handler modules.
//!
//! A [`HandlerType`] states, at compile time, which capabilities a concrete
//! type provides and how to construct it. The builder checks these
//! declarations when a type is registered, so a type registered for the
//! wrong role is rejected immediately.
//!
//! A [`HandlerModule`] groups handler types the way a crate or feature
//! module would, so they can be registered in one call.
//!
//! # Example
//!
//! ```ignore
//! use mediator_builder::{HandlerModule, HandlerType};
//!
//! let ping = HandlerType::describe::<PingHandler>().handles::<Ping>();
//! let audit = HandlerType::describe_with::<AuditHandler, _>(|resolver| {
//!     Ok(AuditHandler::new(resolver.require::<AuditLog>()?))
//! })
//! .listens::<UserDeleted>();
//!
//! let module = HandlerModule::new("accounts").with(ping).with(audit);
//! ```

use std::any::TypeId;
use std::future::Future;
use std::sync::Arc;

use super::{FnHandler, HandlerContext, NotificationHandler, Request, RequestHandler};
use crate::container::{Resolver, Service, ServiceKey};
use crate::error::{Capability, Result};
use crate::notification::Subscriber;
use crate::pipeline::{DynRequestHandler, RequestDecorator, RequestDescriptor, TypedRequestHandler};

type InstanceFactory<H> = Arc<dyn Fn(&dyn Resolver) -> Result<Arc<H>> + Send + Sync>;

pub(crate) type RequestFactory =
    Arc<dyn Fn(&dyn Resolver) -> Result<Arc<dyn DynRequestHandler>> + Send + Sync>;

pub(crate) type DecoratorFactory =
    Arc<dyn Fn(&dyn Resolver) -> Result<Arc<dyn RequestDecorator>> + Send + Sync>;

pub(crate) type SubscriberFactory = Arc<dyn Fn(&dyn Resolver) -> Result<Service> + Send + Sync>;

/// A request/response pair a handler type serves.
#[derive(Clone)]
pub(crate) struct RequestBinding {
    pub(crate) descriptor: RequestDescriptor,
    pub(crate) handler: &'static str,
    pub(crate) factory: RequestFactory,
}

/// A notification (or view) a handler type subscribes to.
#[derive(Clone)]
pub(crate) struct NotificationBinding {
    pub(crate) key: ServiceKey,
    pub(crate) notification: &'static str,
    pub(crate) handler: &'static str,
    pub(crate) factory: SubscriberFactory,
}

/// Capability declaration for one concrete handler type.
#[derive(Clone)]
pub struct HandlerType {
    name: &'static str,
    type_id: TypeId,
    requests: Vec<RequestBinding>,
    notifications: Vec<NotificationBinding>,
    decorator: Option<DecoratorFactory>,
}

impl HandlerType {
    /// Describe a handler type constructed with `Default`.
    pub fn describe<H>() -> HandlerTypeBuilder<H>
    where
        H: Default + Send + Sync + 'static,
    {
        HandlerTypeBuilder::new(Arc::new(|_: &dyn Resolver| -> Result<Arc<H>> {
            Ok(Arc::new(H::default()))
        }))
    }

    /// Describe a handler type built from the container by `factory`.
    pub fn describe_with<H, F>(factory: F) -> HandlerTypeBuilder<H>
    where
        H: Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<H> + Send + Sync + 'static,
    {
        HandlerTypeBuilder::new(Arc::new(move |resolver: &dyn Resolver| -> Result<Arc<H>> {
            factory(resolver).map(Arc::new)
        }))
    }

    /// Describe an async closure handling request `R`.
    pub fn from_fn<R, F, Fut>(name: &'static str, handler: F) -> HandlerType
    where
        R: Request,
        F: Fn(R, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Response>> + Send + 'static,
    {
        let handler = Arc::new(FnHandler::new(handler));
        let factory: InstanceFactory<FnHandler<F, R, Fut>> =
            Arc::new(move |_: &dyn Resolver| -> Result<Arc<FnHandler<F, R, Fut>>> {
                Ok(handler.clone())
            });
        let mut described = HandlerTypeBuilder::new(factory).handles::<R>().build();
        described.name = name;
        for binding in &mut described.requests {
            binding.handler = name;
        }
        described
    }

    /// Type name of the handler.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `TypeId` of the handler.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Check whether the type declares `capability`.
    pub fn implements(&self, capability: Capability) -> bool {
        match capability {
            Capability::RequestHandler => !self.requests.is_empty(),
            Capability::NotificationHandler => !self.notifications.is_empty(),
            Capability::RequestDecorator => self.decorator.is_some(),
        }
    }

    /// Requests this type handles.
    pub fn request_types(&self) -> impl Iterator<Item = &RequestDescriptor> + '_ {
        self.requests.iter().map(|b| &b.descriptor)
    }

    /// Names of the notifications (or views) this type handles.
    pub fn notification_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.notifications.iter().map(|b| b.notification)
    }

    pub(crate) fn request_bindings(&self) -> &[RequestBinding] {
        &self.requests
    }

    pub(crate) fn notification_bindings(&self) -> &[NotificationBinding] {
        &self.notifications
    }

    pub(crate) fn decorator_factory(&self) -> Option<&DecoratorFactory> {
        self.decorator.as_ref()
    }
}

impl std::fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerType")
            .field("name", &self.name)
            .field(
                "requests",
                &self.request_types().map(|d| d.request_name()).collect::<Vec<_>>(),
            )
            .field(
                "notifications",
                &self.notification_types().collect::<Vec<_>>(),
            )
            .field("decorator", &self.decorator.is_some())
            .finish()
    }
}

/// Builder declaring the capabilities of handler type `H`.
///
/// Each declaration is checked by the compiler: `handles::<R>()` only
/// compiles if `H: RequestHandler<R>`.
pub struct HandlerTypeBuilder<H> {
    factory: InstanceFactory<H>,
    described: HandlerType,
}

impl<H> HandlerTypeBuilder<H>
where
    H: Send + Sync + 'static,
{
    fn new(factory: InstanceFactory<H>) -> Self {
        Self {
            factory,
            described: HandlerType {
                name: std::any::type_name::<H>(),
                type_id: TypeId::of::<H>(),
                requests: Vec::new(),
                notifications: Vec::new(),
                decorator: None,
            },
        }
    }

    /// Declare that `H` handles request `R`.
    pub fn handles<R>(mut self) -> Self
    where
        R: Request,
        H: RequestHandler<R>,
    {
        let factory = self.factory.clone();
        self.described.requests.push(RequestBinding {
            descriptor: RequestDescriptor::of::<R>(),
            handler: self.described.name,
            factory: Arc::new(move |resolver: &dyn Resolver| -> Result<Arc<dyn DynRequestHandler>> {
                let handler = factory(resolver)?;
                Ok(Arc::new(TypedRequestHandler::<R, H>::new(handler)) as Arc<dyn DynRequestHandler>)
            }),
        });
        self
    }

    /// Declare that `H` handles notification (or view) `N`.
    pub fn listens<N>(mut self) -> Self
    where
        N: ?Sized + Sync + 'static,
        H: NotificationHandler<N>,
    {
        let factory = self.factory.clone();
        let name = self.described.name;
        self.described.notifications.push(NotificationBinding {
            key: ServiceKey::notification::<N>(),
            notification: std::any::type_name::<N>(),
            handler: name,
            factory: Arc::new(move |resolver: &dyn Resolver| -> Result<Service> {
                let handler: Arc<dyn NotificationHandler<N>> = factory(resolver)?;
                Ok(Arc::new(Subscriber::<N> { name, handler }) as Service)
            }),
        });
        self
    }

    /// Declare that `H` is a request decorator.
    pub fn decorates(mut self) -> Self
    where
        H: RequestDecorator,
    {
        let factory = self.factory.clone();
        self.described.decorator = Some(Arc::new(move |resolver: &dyn Resolver| -> Result<Arc<dyn RequestDecorator>> {
            let decorator: Arc<dyn RequestDecorator> = factory(resolver)?;
            Ok(decorator)
        }));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> HandlerType {
        self.described
    }
}

impl<H> From<HandlerTypeBuilder<H>> for HandlerType
where
    H: Send + Sync + 'static,
{
    fn from(builder: HandlerTypeBuilder<H>) -> Self {
        builder.build()
    }
}

/// A named group of handler types registered together.
#[derive(Debug, Clone, Default)]
pub struct HandlerModule {
    name: &'static str,
    types: Vec<HandlerType>,
}

impl HandlerModule {
    /// Create an empty module.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            types: Vec::new(),
        }
    }

    /// Add a handler type (builder style).
    pub fn with(mut self, handler_type: impl Into<HandlerType>) -> Self {
        self.types.push(handler_type.into());
        self
    }

    /// Add a handler type.
    pub fn add(&mut self, handler_type: impl Into<HandlerType>) -> &mut Self {
        self.types.push(handler_type.into());
        self
    }

    /// Module name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Handler types in declaration order.
    pub fn types(&self) -> &[HandlerType] {
        &self.types
    }

    /// Number of handler types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the module is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
