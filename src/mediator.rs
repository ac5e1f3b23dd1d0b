//! Dispatch facade.
//!
//! A [`Mediator`] is produced by [`MediatorBuilder::build`] and is the only
//! thing callers keep afterwards. It is cheap to clone and can be shared
//! across tasks; concurrent dispatches only share the immutable
//! registration graph.
//!
//! # Example
//!
//! ```ignore
//! let token = CancellationToken::new();
//! let pong = mediator.send_with(Ping::new("hi"), token.clone()).await?;
//!
//! mediator.publish(&UserDeleted { id: 7 }).await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builder::MediatorBuilder;
use crate::config::{MediatorConfig, PublishStrategy};
use crate::container::{Resolver, ServiceKey};
use crate::error::{MediatorError, Result};
use crate::handler::{HandlerContext, Notification, Request};
use crate::notification::{Delivery, NotificationViews};
use crate::pipeline::{Envelope, RequestChain};
use crate::report::RegistrationReport;

struct Inner {
    resolver: Arc<dyn Resolver>,
    config: MediatorConfig,
    report: RegistrationReport,
    next_request_id: AtomicU64,
}

/// Finalised dispatcher for requests and notifications.
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<Inner>,
}

impl Mediator {
    /// Create a new mediator builder with an empty container.
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::default()
    }

    pub(crate) fn new(
        resolver: Arc<dyn Resolver>,
        config: MediatorConfig,
        report: RegistrationReport,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                config,
                report,
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    /// Send a request to its handler chain and return the response.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response> {
        self.send_with(request, CancellationToken::new()).await
    }

    /// Send a request, stopping early once `token` is cancelled.
    ///
    /// Handler errors are returned exactly as the handler produced them.
    pub async fn send_with<R: Request>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> Result<R::Response> {
        let request_name = std::any::type_name::<R>();
        let chain = self
            .inner
            .resolver
            .resolve(ServiceKey::request::<R>())
            .and_then(|service| service.downcast::<RequestChain>().ok())
            .ok_or(MediatorError::HandlerNotFound(request_name))?;

        let ctx = HandlerContext::with_cancellation(self.next_request_id(), token.clone());
        let request_id = ctx.request_id();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(MediatorError::Cancelled),
            response = chain.dispatch(Envelope::new(request), ctx) => response,
        };

        match outcome {
            Ok(response) => response.downcast::<R::Response>(),
            Err(e) => {
                debug!(request = request_name, request_id, error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Publish a notification to every registered handler.
    ///
    /// Handlers registered for any view the notification declares are
    /// invoked as well. Publishing with no handlers is not an error.
    pub async fn publish<N: Notification>(&self, notification: &N) -> Result<()> {
        self.publish_with(notification, CancellationToken::new()).await
    }

    /// Publish a notification, stopping early once `token` is cancelled.
    pub async fn publish_with<N: Notification>(
        &self,
        notification: &N,
        token: CancellationToken,
    ) -> Result<()> {
        let notification_name = std::any::type_name::<N>();
        let ctx = HandlerContext::with_cancellation(self.next_request_id(), token.clone());

        let mut views = NotificationViews::new(self.inner.resolver.as_ref(), ctx);
        views.view::<N>(notification);
        notification.deliver_as(&mut views);
        let deliveries = views.into_deliveries();

        if deliveries.is_empty() {
            debug!(notification = notification_name, "No handlers for notification");
            return Ok(());
        }

        let result = match self.inner.config.publish_strategy {
            PublishStrategy::Sequential => publish_sequential(deliveries, &token).await,
            PublishStrategy::Concurrent => publish_concurrent(deliveries, &token).await,
        };
        if let Err(e) = &result {
            debug!(notification = notification_name, error = %e, "Publish failed");
        }
        result
    }

    /// Snapshot of the wiring produced by `build()`.
    pub fn registrations(&self) -> &RegistrationReport {
        &self.inner.report
    }

    /// Configuration the mediator was built with.
    pub fn config(&self) -> &MediatorConfig {
        &self.inner.config
    }

    /// Resolver holding caller services and the finalised registrations.
    pub fn resolver(&self) -> &dyn Resolver {
        self.inner.resolver.as_ref()
    }

    /// Check if a handler is registered for request type `R`.
    pub fn handles<R: Request>(&self) -> bool {
        self.inner
            .resolver
            .resolve(ServiceKey::request::<R>())
            .is_some()
    }

    fn next_request_id(&self) -> u64 {
        self.inner.next_request_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("config", &self.inner.config)
            .field("report", &self.inner.report)
            .finish()
    }
}

async fn publish_sequential(deliveries: Vec<Delivery<'_>>, token: &CancellationToken) -> Result<()> {
    for delivery in deliveries {
        let handler = delivery.handler;
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(MediatorError::Cancelled),
            result = delivery.future => {
                if let Err(e) = result {
                    debug!(handler, "Notification handler failed");
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

async fn publish_concurrent(deliveries: Vec<Delivery<'_>>, token: &CancellationToken) -> Result<()> {
    let handlers: Vec<&'static str> = deliveries.iter().map(|d| d.handler).collect();
    let futures = deliveries.into_iter().map(|d| d.future);

    let results = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(MediatorError::Cancelled),
        results = join_all(futures) => results,
    };

    let mut first_error = None;
    for (handler, result) in handlers.into_iter().zip(results) {
        if let Err(e) = result {
            debug!(handler, error = %e, "Notification handler failed");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
