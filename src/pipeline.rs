//! Request pipeline - type-erased payloads and decorator chains.
//!
//! Decorators are generic over every request type, so they work on an
//! [`Envelope`] instead of a concrete request. A chain is an explicit linked
//! list built once at `build()` time:
//!
//! ```text
//! send(Ping) ─► decorator_two ─► decorator_one ─► PingHandler
//!               (last added)     (first added)    (key "handler")
//! ```
//!
//! Each link checks the dispatch's cancellation token before delegating,
//! so a cancelled dispatch stops at the next link boundary.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{MediatorError, Result};
use crate::handler::{BoxFuture, HandlerContext, Request, RequestHandler};

/// Type-erased request or response value.
///
/// Keeps the concrete type's name and `Debug` output so that generic
/// decorators (logging, validation) can inspect it without knowing the type.
pub struct Envelope {
    value: Box<dyn Any + Send>,
    type_id: TypeId,
    type_name: &'static str,
    debug: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

fn debug_as<T: Any + fmt::Debug>(value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(v) => fmt::Debug::fmt(v, f),
        None => f.write_str("<unknown>"),
    }
}

impl Envelope {
    /// Wrap a value.
    pub fn new<T: Any + Send + fmt::Debug>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            debug: debug_as::<T>,
        }
    }

    /// Name of the wrapped type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the wrapped type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Check whether the envelope holds a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Mutably borrow the wrapped value as `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Borrow the wrapped value as `dyn Any`.
    pub fn as_any(&self) -> &dyn Any {
        &*self.value
    }

    /// Take the wrapped value out as `T`.
    pub fn downcast<T: Any>(self) -> Result<T> {
        let actual = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| MediatorError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            })
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug)(&*self.value, f)
    }
}

/// Identity of a request type and its response type.
#[derive(Debug, Clone, Copy)]
pub struct RequestDescriptor {
    type_id: TypeId,
    request: &'static str,
    response: &'static str,
}

impl RequestDescriptor {
    /// Describe request type `R`.
    pub fn of<R: Request>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            request: std::any::type_name::<R>(),
            response: std::any::type_name::<R::Response>(),
        }
    }

    /// `TypeId` of the request.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Type name of the request.
    #[inline]
    pub fn request_name(&self) -> &'static str {
        self.request
    }

    /// Type name of the response.
    #[inline]
    pub fn response_name(&self) -> &'static str {
        self.response
    }

    /// Check whether this describes request type `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for RequestDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RequestDescriptor {}

/// Object-safe request handler working on envelopes.
pub(crate) trait DynRequestHandler: Send + Sync + 'static {
    /// Handle a wrapped request and produce a wrapped response.
    fn handle_dyn(&self, request: Envelope, ctx: HandlerContext) -> BoxFuture<'_, Result<Envelope>>;
}

/// Adapter from a typed [`RequestHandler`] to [`DynRequestHandler`].
pub(crate) struct TypedRequestHandler<R, H> {
    handler: Arc<H>,
    _marker: PhantomData<fn(R)>,
}

impl<R, H> TypedRequestHandler<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<R, H> DynRequestHandler for TypedRequestHandler<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    fn handle_dyn(&self, request: Envelope, ctx: HandlerContext) -> BoxFuture<'_, Result<Envelope>> {
        Box::pin(async move {
            let request = request.downcast::<R>()?;
            let response = self.handler.handle(request, ctx).await?;
            Ok(Envelope::new(response))
        })
    }
}

/// A handler that wraps every request handler it applies to.
///
/// Decorators see the request before the inner handler and the response
/// after it. They may mutate the request, short-circuit with their own
/// response or error, or transform the response.
///
/// # Example
///
/// ```ignore
/// struct Timing;
///
/// impl RequestDecorator for Timing {
///     fn handle<'a>(
///         &'a self,
///         request: Envelope,
///         ctx: HandlerContext,
///         next: Next<'a>,
///     ) -> BoxFuture<'a, Result<Envelope>> {
///         Box::pin(async move {
///             let started = std::time::Instant::now();
///             let response = next.run(request, ctx).await;
///             tracing::debug!(elapsed = ?started.elapsed(), "request finished");
///             response
///         })
///     }
/// }
/// ```
pub trait RequestDecorator: Send + Sync + 'static {
    /// Handle a request, usually delegating to `next`.
    fn handle<'a>(
        &'a self,
        request: Envelope,
        ctx: HandlerContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>>;

    /// Whether this decorator wraps handlers of the given request type.
    fn applies_to(&self, request: &RequestDescriptor) -> bool {
        let _ = request;
        true
    }
}

/// Handle to the next link of a chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: &'a dyn DynRequestHandler,
    key: &'a str,
    handler: &'static str,
}

impl<'a> Next<'a> {
    /// Key of the link this handle delegates to.
    #[inline]
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Type name of the handler at the bottom of the chain.
    #[inline]
    pub fn handler_name(&self) -> &'static str {
        self.handler
    }

    /// Invoke the inner link unless the dispatch was cancelled.
    pub fn run(self, request: Envelope, ctx: HandlerContext) -> BoxFuture<'a, Result<Envelope>> {
        if let Err(e) = ctx.check_cancelled() {
            return Box::pin(async move { Err(e) });
        }
        self.inner.handle_dyn(request, ctx)
    }
}

/// One decorator ready to be stacked, under its key.
#[derive(Clone)]
pub(crate) struct DecoratorLayer {
    pub(crate) key: String,
    pub(crate) decorator: Arc<dyn RequestDecorator>,
}

/// A decorator bound to the link it wraps.
struct DecoratedHandler {
    key: String,
    decorator: Arc<dyn RequestDecorator>,
    inner: Arc<dyn DynRequestHandler>,
    inner_key: String,
    handler_name: &'static str,
}

impl DynRequestHandler for DecoratedHandler {
    fn handle_dyn(&self, request: Envelope, ctx: HandlerContext) -> BoxFuture<'_, Result<Envelope>> {
        if let Err(e) = ctx.check_cancelled() {
            return Box::pin(async move { Err(e) });
        }
        tracing::trace!(key = %self.key, request_id = ctx.request_id(), "Entering decorator");

        let next = Next {
            inner: self.inner.as_ref(),
            key: &self.inner_key,
            handler: self.handler_name,
        };
        self.decorator.handle(request, ctx, next)
    }
}

/// Fully composed chain for one request type.
pub(crate) struct RequestChain {
    descriptor: RequestDescriptor,
    handler_name: &'static str,
    /// Link keys from outermost to innermost.
    keys: Vec<String>,
    head: Arc<dyn DynRequestHandler>,
}

impl RequestChain {
    /// Stack `layers` (in registration order) around `handler`.
    ///
    /// The last layer ends up outermost. Layers whose decorator does not
    /// apply to `descriptor` are skipped.
    pub(crate) fn compose(
        descriptor: RequestDescriptor,
        handler_name: &'static str,
        base_key: &str,
        handler: Arc<dyn DynRequestHandler>,
        layers: &[DecoratorLayer],
    ) -> Self {
        let mut head = handler;
        let mut keys = vec![base_key.to_string()];

        for layer in layers {
            if !layer.decorator.applies_to(&descriptor) {
                tracing::debug!(
                    key = %layer.key,
                    request = descriptor.request_name(),
                    "Decorator does not apply, skipping"
                );
                continue;
            }

            let inner_key = keys.last().cloned().unwrap_or_default();
            head = Arc::new(DecoratedHandler {
                key: layer.key.clone(),
                decorator: layer.decorator.clone(),
                inner: head,
                inner_key,
                handler_name,
            });
            keys.push(layer.key.clone());
        }

        keys.reverse();

        Self {
            descriptor,
            handler_name,
            keys,
            head,
        }
    }

    pub(crate) fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub(crate) fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    pub(crate) fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Run the chain from its outermost link.
    pub(crate) fn dispatch(
        &self,
        request: Envelope,
        ctx: HandlerContext,
    ) -> BoxFuture<'_, Result<Envelope>> {
        if let Err(e) = ctx.check_cancelled() {
            return Box::pin(async move { Err(e) });
        }
        self.head.handle_dyn(request, ctx)
    }
}
