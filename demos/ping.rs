//! Ping - request, notification and add-on example.
//!
//! This example demonstrates:
//! - Describing handler types and registering them with the builder
//! - Stacking the validation and logging decorators
//! - Publishing a notification to a handler written against a view
//! - Printing the registration report
//!
//! # Running
//!
//! ```text
//! RUST_LOG=info cargo run --example ping
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use mediator_builder::{
    BoxFuture, Container, HandlerContext, HandlerType, MediatorBuilder, MediatorError,
    Notification, NotificationHandler, NotificationViews, Request, RequestHandler, Result,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Request answered with a greeting.
#[derive(Debug, Validate)]
struct Ping {
    #[validate(length(min = 1, max = 32))]
    name: String,
}

impl Request for Ping {
    type Response = String;
}

#[derive(Default)]
struct PingHandler;

impl RequestHandler<Ping> for PingHandler {
    fn handle(&self, ping: Ping, _ctx: HandlerContext) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { Ok(format!("pong, {}", ping.name)) })
    }
}

/// Anything with an audit trail.
trait Audited: Send + Sync {
    fn record(&self, entry: &str);
}

/// Notification published after every ping.
#[derive(Default)]
struct Pinged {
    audit: AtomicUsize,
}

impl Audited for Pinged {
    fn record(&self, entry: &str) {
        let n = self.audit.fetch_add(1, Ordering::SeqCst) + 1;
        info!(entry, n, "Audit entry");
    }
}

impl Notification for Pinged {
    fn deliver_as<'a>(&'a self, views: &mut NotificationViews<'a>) {
        views.view::<dyn Audited>(self);
    }
}

#[derive(Default)]
struct AuditHandler;

impl NotificationHandler<dyn Audited> for AuditHandler {
    fn handle<'a>(&'a self, event: &'a dyn Audited, ctx: HandlerContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            event.record(&format!("request {}", ctx.request_id()));
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut container = Container::new();
    container.add_derived_validator::<Ping>();

    let mediator = MediatorBuilder::new(container)
        .with_request_handler(HandlerType::describe::<PingHandler>().handles::<Ping>())?
        .with_notification_handler(HandlerType::describe::<AuditHandler>().listens::<dyn Audited>())?
        .use_validation()?
        .use_logging()?
        .build()?;

    let pong = mediator.send(Ping { name: "world".into() }).await?;
    info!(%pong, "Got response");

    match mediator.send(Ping { name: String::new() }).await {
        Err(MediatorError::Validation(failures)) => {
            warn!(fields = ?failures.fields(), "Rejected invalid ping")
        }
        other => warn!(?other, "Unexpected result"),
    }

    let pinged = Pinged::default();
    mediator.publish(&pinged).await?;

    println!("{}", mediator.registrations().to_json_pretty());

    Ok(())
}
