//! Notification fan-out.
//!
//! Publishing `N` collects one delivery per subscriber registered for `N`
//! itself, then one per subscriber of every view `N` declares through
//! [`Notification::deliver_as`](crate::Notification::deliver_as).

use std::sync::Arc;

use crate::container::{Resolver, ServiceKey};
use crate::error::Result;
use crate::handler::{BoxFuture, HandlerContext, NotificationHandler};

/// Subscriber stored in the container under `ServiceKey::notification::<N>()`.
pub(crate) struct Subscriber<N: ?Sized + Sync + 'static> {
    pub(crate) name: &'static str,
    pub(crate) handler: Arc<dyn NotificationHandler<N>>,
}

/// One pending handler invocation.
pub(crate) struct Delivery<'a> {
    pub(crate) handler: &'static str,
    pub(crate) future: BoxFuture<'a, Result<()>>,
}

/// Collects the deliveries for one published notification.
pub struct NotificationViews<'a> {
    resolver: &'a dyn Resolver,
    ctx: HandlerContext,
    deliveries: Vec<Delivery<'a>>,
}

impl<'a> NotificationViews<'a> {
    pub(crate) fn new(resolver: &'a dyn Resolver, ctx: HandlerContext) -> Self {
        Self {
            resolver,
            ctx,
            deliveries: Vec::new(),
        }
    }

    /// Deliver the notification, seen as `V`, to every handler of `V`.
    pub fn view<V>(&mut self, view: &'a V) -> &mut Self
    where
        V: ?Sized + Sync + 'static,
    {
        for service in self.resolver.resolve_all(ServiceKey::notification::<V>()) {
            let Ok(subscriber) = service.downcast::<Subscriber<V>>() else {
                tracing::warn!(
                    view = std::any::type_name::<V>(),
                    "Notification service has unexpected type, skipping"
                );
                continue;
            };

            let ctx = self.ctx.clone();
            let handler = subscriber.name;
            let future: BoxFuture<'a, Result<()>> =
                Box::pin(async move { subscriber.handler.handle(view, ctx).await });
            self.deliveries.push(Delivery { handler, future });
        }
        self
    }

    /// Number of deliveries collected so far.
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    /// Check if no handler was found.
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub(crate) fn into_deliveries(self) -> Vec<Delivery<'a>> {
        self.deliveries
    }
}
