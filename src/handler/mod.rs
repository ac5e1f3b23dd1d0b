//! Handler module - capabilities and per-dispatch context.
//!
//! Provides:
//! - [`Request`], [`RequestHandler`], [`Notification`], [`NotificationHandler`] - capability traits
//! - [`HandlerType`] - compile-time capability declaration for a concrete type
//! - [`HandlerModule`] - a group of handler types registered together
//! - [`HandlerContext`] - request id and cancellation for one dispatch
//!
//! # Example
//!
//! ```ignore
//! use mediator_builder::{HandlerContext, HandlerType, Request, RequestHandler, BoxFuture, Result};
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! impl Request for Ping {
//!     type Response = &'static str;
//! }
//!
//! #[derive(Default)]
//! struct PingHandler;
//!
//! impl RequestHandler<Ping> for PingHandler {
//!     fn handle(&self, _: Ping, _ctx: HandlerContext) -> BoxFuture<'_, Result<&'static str>> {
//!         Box::pin(async { Ok("pong") })
//!     }
//! }
//!
//! let ping = HandlerType::describe::<PingHandler>().handles::<Ping>();
//! ```

pub(crate) mod component;
mod context;
mod traits;

pub use component::{HandlerModule, HandlerType, HandlerTypeBuilder};
pub use context::HandlerContext;
pub use traits::{
    BoxFuture, FnHandler, Notification, NotificationHandler, Request, RequestHandler,
};
