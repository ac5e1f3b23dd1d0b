//! Request logging decorator.
//!
//! `use_logging()` installs a decorator under the key `"logging"` that logs
//! every request before the inner link runs and the response after it, at
//! `info`, inside a span carrying the request id. Failures are logged at
//! `warn` and returned unchanged.

use tracing::{info, info_span, warn, Instrument};

use crate::builder::MediatorBuilder;
use crate::error::Result;
use crate::handler::{BoxFuture, HandlerContext, HandlerType};
use crate::pipeline::{Envelope, Next, RequestDecorator};

/// Decorator key used by [`MediatorBuilder::use_logging`].
pub const LOGGING_KEY: &str = "logging";

/// Logs requests and responses through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingDecorator;

impl RequestDecorator for LoggingDecorator {
    fn handle<'a>(
        &'a self,
        request: Envelope,
        ctx: HandlerContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        let span = info_span!(
            "mediator.request",
            request_id = ctx.request_id(),
            request = request.type_name(),
            handler = next.handler_name(),
            next = next.key(),
        );

        Box::pin(
            async move {
                info!(request = ?request, "Request");
                match next.run(request, ctx).await {
                    Ok(response) => {
                        info!(response = ?response, "Response");
                        Ok(response)
                    }
                    Err(e) => {
                        warn!(error = %e, "Request failed");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}

impl MediatorBuilder {
    /// Install the logging decorator under the key `"logging"`.
    pub fn use_logging(&mut self) -> Result<&mut Self> {
        self.with_request_decorator(LOGGING_KEY, HandlerType::describe::<LoggingDecorator>().decorates())
    }
}
