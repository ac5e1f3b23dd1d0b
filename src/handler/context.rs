//! Dispatch context for handlers.
//!
//! Every `send` and `publish` creates one [`HandlerContext`] and passes a
//! clone of it through the whole decorator chain (or to every notification
//! handler). It carries:
//! - `request_id` - monotonically increasing id assigned by the mediator
//! - a [`CancellationToken`] chosen by the caller
//!
//! # Example
//!
//! ```ignore
//! impl RequestHandler<Fetch> for FetchHandler {
//!     fn handle(&self, request: Fetch, ctx: HandlerContext) -> BoxFuture<'_, Result<Page>> {
//!         Box::pin(async move {
//!             tokio::select! {
//!                 _ = ctx.cancelled() => Err(MediatorError::Cancelled),
//!                 page = self.client.get(&request.url) => page.map_err(MediatorError::handler),
//!             }
//!         })
//!     }
//! }
//! ```

use tokio_util::sync::CancellationToken;

use crate::error::{MediatorError, Result};

/// Context passed to handlers and decorators.
///
/// `HandlerContext` is `Clone`; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Id of the dispatch this context belongs to.
    request_id: u64,
    /// Cancellation signal for the dispatch.
    token: CancellationToken,
}

impl HandlerContext {
    /// Create a context with a fresh, never-cancelled token (for testing).
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id,
            token: CancellationToken::new(),
        }
    }

    /// Create a context bound to the caller's cancellation token.
    pub fn with_cancellation(request_id: u64, token: CancellationToken) -> Self {
        Self { request_id, token }
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Get the cancellation token.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Check if cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Return `Err(Cancelled)` if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(MediatorError::Cancelled);
        }
        Ok(())
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
