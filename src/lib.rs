//! # mediator-builder
//!
//! In-process request/response and publish/subscribe dispatch with a
//! registration builder.
//!
//! Handler types declare their capabilities once, the [`MediatorBuilder`]
//! checks and collects them, stacks request decorators around every request
//! handler, and `build()` returns a [`Mediator`] that dispatches without any
//! further lookups.
//!
//! ## Architecture
//!
//! - **Requests**: exactly one handler per request type, wrapped by every
//!   applicable decorator (last registered is outermost)
//! - **Notifications**: any number of handlers per notification type or
//!   notification view, invoked sequentially or concurrently
//! - **Add-ons**: `use_validation()` and `use_logging()` install the
//!   built-in decorators
//!
//! ## Example
//!
//! ```ignore
//! use mediator_builder::{HandlerType, Mediator};
//!
//! #[tokio::main]
//! async fn main() -> mediator_builder::Result<()> {
//!     let mediator = Mediator::builder()
//!         .with_request_handler(HandlerType::describe::<PingHandler>().handles::<Ping>())?
//!         .with_notification_handler(HandlerType::describe::<AuditHandler>().listens::<UserDeleted>())?
//!         .use_logging()?
//!         .build()?;
//!
//!     let pong = mediator.send(Ping).await?;
//!     mediator.publish(&UserDeleted { id: 7 }).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod handler;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod validation;

mod builder;
mod mediator;
mod notification;

pub use builder::{BuilderState, MediatorBuilder};
pub use config::{MediatorConfig, PublishStrategy};
pub use container::{Container, Resolver, ResolverExt, ServiceKey};
pub use error::{Capability, MediatorError, Result};
pub use handler::{
    BoxFuture, FnHandler, HandlerContext, HandlerModule, HandlerType, HandlerTypeBuilder,
    Notification, NotificationHandler, Request, RequestHandler,
};
pub use logging::LoggingDecorator;
pub use mediator::Mediator;
pub use notification::NotificationViews;
pub use pipeline::{Envelope, Next, RequestDecorator, RequestDescriptor};
pub use validation::{RequestValidator, ValidationDecorator, ValidationFailures};

pub use tokio_util::sync::CancellationToken;
