//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mediator_builder::{
    BoxFuture, Envelope, HandlerContext, HandlerModule, HandlerType, MediatorError, Next,
    Notification, NotificationHandler, NotificationViews, Request, RequestDecorator,
    RequestDescriptor, RequestHandler, Result,
};
use validator::Validate;

#[derive(Debug, Default, Clone)]
pub struct Ping {
    pub message: String,
}

impl Ping {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pong {
    pub message: String,
}

impl Request for Ping {
    type Response = Pong;
}

#[derive(Debug, Default, Clone)]
pub struct AnotherPing {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnotherPong {
    pub message: String,
}

impl Request for AnotherPing {
    type Response = AnotherPong;
}

#[derive(Default)]
pub struct PingHandler;

impl RequestHandler<Ping> for PingHandler {
    fn handle(&self, request: Ping, _ctx: HandlerContext) -> BoxFuture<'_, Result<Pong>> {
        Box::pin(async move {
            Ok(Pong {
                message: format!("{}Handled", request.message),
            })
        })
    }
}

#[derive(Default)]
pub struct AnotherPingHandler;

impl RequestHandler<AnotherPing> for AnotherPingHandler {
    fn handle(
        &self,
        request: AnotherPing,
        _ctx: HandlerContext,
    ) -> BoxFuture<'_, Result<AnotherPong>> {
        Box::pin(async move {
            Ok(AnotherPong {
                message: format!("{}Handled", request.message),
            })
        })
    }
}

/// Message field of any fixture request.
fn message_mut(request: &mut Envelope) -> Option<&mut String> {
    if request.is::<Ping>() {
        return request.downcast_mut::<Ping>().map(|p| &mut p.message);
    }
    request.downcast_mut::<AnotherPing>().map(|p| &mut p.message)
}

fn carries_message(request: &RequestDescriptor) -> bool {
    request.is::<Ping>() || request.is::<AnotherPing>()
}

/// Appends "DecoratorOne" to the request message.
#[derive(Default)]
pub struct DecoratorOne;

impl RequestDecorator for DecoratorOne {
    fn handle<'a>(
        &'a self,
        mut request: Envelope,
        ctx: HandlerContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        if let Some(message) = message_mut(&mut request) {
            message.push_str("DecoratorOne");
        }
        next.run(request, ctx)
    }

    fn applies_to(&self, request: &RequestDescriptor) -> bool {
        carries_message(request)
    }
}

/// Appends "DecoratorTwo" to the request message.
#[derive(Default)]
pub struct DecoratorTwo;

impl RequestDecorator for DecoratorTwo {
    fn handle<'a>(
        &'a self,
        mut request: Envelope,
        ctx: HandlerContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        if let Some(message) = message_mut(&mut request) {
            message.push_str("DecoratorTwo");
        }
        next.run(request, ctx)
    }

    fn applies_to(&self, request: &RequestDescriptor) -> bool {
        carries_message(request)
    }
}

/// Short-circuits every request with an error.
#[derive(Default)]
pub struct Reject;

impl RequestDecorator for Reject {
    fn handle<'a>(
        &'a self,
        _request: Envelope,
        _ctx: HandlerContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        Box::pin(async { Err(MediatorError::handler("rejected")) })
    }
}

pub trait CountedNotification: Send + Sync {
    fn increment(&self);
}

#[derive(Debug, Default)]
pub struct Note {
    count: AtomicUsize,
}

impl Note {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl CountedNotification for Note {
    fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Notification for Note {
    fn deliver_as<'a>(&'a self, views: &mut NotificationViews<'a>) {
        views.view::<dyn CountedNotification>(self);
    }
}

#[derive(Default)]
pub struct NoteHandler;

impl NotificationHandler<Note> for NoteHandler {
    fn handle<'a>(&'a self, note: &'a Note, _ctx: HandlerContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            note.increment();
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct AnotherNoteHandler;

impl NotificationHandler<Note> for AnotherNoteHandler {
    fn handle<'a>(&'a self, note: &'a Note, _ctx: HandlerContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            note.increment();
            Ok(())
        })
    }
}

/// Handles every notification exposing [`CountedNotification`].
#[derive(Default)]
pub struct GenericNotificationHandler;

impl NotificationHandler<dyn CountedNotification> for GenericNotificationHandler {
    fn handle<'a>(
        &'a self,
        notification: &'a dyn CountedNotification,
        _ctx: HandlerContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            notification.increment();
            Ok(())
        })
    }
}

/// Never finishes on its own; only cancellation stops it.
#[derive(Debug)]
pub struct Stall;

impl Request for Stall {
    type Response = ();
}

#[derive(Default)]
pub struct StallHandler;

impl RequestHandler<Stall> for StallHandler {
    fn handle(&self, _: Stall, ctx: HandlerContext) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            tokio::select! {
                _ = ctx.cancelled() => Err(MediatorError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(()),
            }
        })
    }
}

#[derive(Debug, Validate)]
pub struct Register {
    #[validate(email)]
    pub email: String,
}

impl Request for Register {
    type Response = String;
}

#[derive(Default)]
pub struct RegisterHandler {
    calls: AtomicUsize,
}

impl RequestHandler<Register> for RegisterHandler {
    fn handle(&self, request: Register, _ctx: HandlerContext) -> BoxFuture<'_, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(format!("registered {}", request.email)) })
    }
}

/// Declares no capability at all.
#[derive(Default)]
pub struct NotAHandler;

/// Every fixture type, the way a feature module would group them.
pub fn module() -> HandlerModule {
    HandlerModule::new("fixtures")
        .with(HandlerType::describe::<PingHandler>().handles::<Ping>())
        .with(HandlerType::describe::<AnotherPingHandler>().handles::<AnotherPing>())
        .with(HandlerType::describe::<NoteHandler>().listens::<Note>())
        .with(HandlerType::describe::<AnotherNoteHandler>().listens::<Note>())
        .with(
            HandlerType::describe::<GenericNotificationHandler>()
                .listens::<dyn CountedNotification>(),
        )
        .with(HandlerType::describe::<DecoratorOne>().decorates())
        .with(HandlerType::describe::<NotAHandler>())
}
