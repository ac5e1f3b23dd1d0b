//! Capability traits implemented by handler types.
//!
//! - [`Request`] / [`RequestHandler`] - one request in, one response out
//! - [`Notification`] / [`NotificationHandler`] - one event, any number of handlers
//! - [`FnHandler`] - adapter turning an async closure into a request handler

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use super::HandlerContext;
use crate::error::Result;
use crate::notification::NotificationViews;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A message with exactly one handler and one response type.
pub trait Request: Send + fmt::Debug + 'static {
    /// Value produced by the handler.
    type Response: Send + fmt::Debug + 'static;
}

/// Handles requests of type `R`.
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    /// Handle a request and produce its response.
    fn handle(&self, request: R, ctx: HandlerContext) -> BoxFuture<'_, Result<R::Response>>;
}

/// A published event delivered to every registered handler.
///
/// Besides its own type, a notification can be delivered as any number of
/// views (usually trait objects it implements), so that a handler written
/// against the view receives every notification exposing it:
///
/// ```ignore
/// pub trait Audited: Send + Sync {
///     fn actor(&self) -> &str;
/// }
///
/// impl Notification for UserDeleted {
///     fn deliver_as<'a>(&'a self, views: &mut NotificationViews<'a>) {
///         views.view::<dyn Audited>(self);
///     }
/// }
/// ```
pub trait Notification: Send + Sync + 'static {
    /// Declare the additional views this notification is delivered as.
    fn deliver_as<'a>(&'a self, views: &mut NotificationViews<'a>) {
        let _ = views;
    }
}

/// Handles notifications (or notification views) of type `N`.
pub trait NotificationHandler<N: ?Sized + Sync + 'static>: Send + Sync + 'static {
    /// Handle one published notification.
    fn handle<'a>(&'a self, notification: &'a N, ctx: HandlerContext) -> BoxFuture<'a, Result<()>>;
}

/// Wrapper that lets an async closure act as a [`RequestHandler`].
pub struct FnHandler<F, R, Fut>
where
    F: Fn(R, HandlerContext) -> Fut + Send + Sync + 'static,
    R: Request,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(R) -> Fut>,
}

impl<F, R, Fut> FnHandler<F, R, Fut>
where
    F: Fn(R, HandlerContext) -> Fut + Send + Sync + 'static,
    R: Request,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    /// Create a new closure handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, R, Fut> RequestHandler<R> for FnHandler<F, R, Fut>
where
    F: Fn(R, HandlerContext) -> Fut + Send + Sync + 'static,
    R: Request,
    Fut: Future<Output = Result<R::Response>> + Send + 'static,
{
    fn handle(&self, request: R, ctx: HandlerContext) -> BoxFuture<'_, Result<R::Response>> {
        Box::pin((self.handler)(request, ctx))
    }
}
