//! Error types for mediator-builder.

use std::fmt;

use thiserror::Error;

use crate::validation::ValidationFailures;

/// Boxed error produced by handler code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Capability a registered type is expected to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Handles a request and returns a response.
    RequestHandler,
    /// Wraps request handlers.
    RequestDecorator,
    /// Handles a published notification.
    NotificationHandler,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::RequestHandler => "RequestHandler<Request, Response>",
            Capability::RequestDecorator => "RequestDecorator",
            Capability::NotificationHandler => "NotificationHandler<Notification>",
        };
        f.write_str(name)
    }
}

/// Main error type for all mediator operations.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// A registered type does not declare the expected capability.
    #[error("{type_name} must implement {expected}")]
    ContractViolation {
        /// Offending type.
        type_name: &'static str,
        /// Capability the registration required.
        expected: Capability,
    },

    /// Builder used after `build()`.
    #[error("Invalid builder state: {0}")]
    InvalidState(&'static str),

    /// Decorator key empty or already taken.
    #[error("Decorator key already registered or empty: {0:?}")]
    DuplicateKey(String),

    /// A factory could not resolve one of its dependencies.
    #[error("Service not registered: {0}")]
    MissingService(&'static str),

    /// No handler registered for the request type.
    #[error("Handler not found for request: {0}")]
    HandlerNotFound(&'static str),

    /// A type-erased payload did not hold the expected type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually carried.
        actual: &'static str,
    },

    /// The dispatch was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Request rejected by the validation decorator.
    #[error("Validation failed: {0}")]
    Validation(ValidationFailures),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Failure raised by a handler or decorator.
    #[error(transparent)]
    Handler(BoxError),
}

impl MediatorError {
    /// Wrap an arbitrary handler failure.
    pub fn handler<E: Into<BoxError>>(err: E) -> Self {
        MediatorError::Handler(err.into())
    }
}

/// Result type alias using MediatorError.
pub type Result<T> = std::result::Result<T, MediatorError>;
