//! Request validation decorator.
//!
//! Validators are plain services registered in the [`Container`] before the
//! mediator is built. `use_validation()` installs a decorator under the key
//! `"validation"` that runs every validator registered for the request type
//! and rejects the request with [`MediatorError::Validation`] if any of them
//! fails. The inner handler is not invoked in that case.
//!
//! # Example
//!
//! ```ignore
//! use validator::Validate;
//!
//! #[derive(Debug, Validate)]
//! struct CreateUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! let mut container = Container::new();
//! container.add_derived_validator::<CreateUser>();
//!
//! let mediator = MediatorBuilder::new(container)
//!     .with_request_handler(HandlerType::describe::<CreateUserHandler>().handles::<CreateUser>())?
//!     .use_validation()?
//!     .build()?;
//! ```

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;
use validator::{Validate, ValidationErrors};

use crate::builder::MediatorBuilder;
use crate::container::{Container, Resolver, ResolverExt};
use crate::error::{MediatorError, Result};
use crate::handler::{BoxFuture, HandlerContext, HandlerType, Request};
use crate::pipeline::{Envelope, Next, RequestDecorator, RequestDescriptor};

/// Decorator key used by [`MediatorBuilder::use_validation`].
pub const VALIDATION_KEY: &str = "validation";

/// Validates requests of type `R`.
pub trait RequestValidator<R: Request>: Send + Sync + 'static {
    /// Check a request; `Err` lists every failed field.
    fn validate(&self, request: &R) -> std::result::Result<(), ValidationErrors>;
}

/// Validator delegating to the request's [`Validate`] implementation.
pub struct DeriveValidator<R>(PhantomData<fn(&R)>);

impl<R> DeriveValidator<R> {
    /// Create a validator for request type `R`.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for DeriveValidator<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request + Validate> RequestValidator<R> for DeriveValidator<R> {
    fn validate(&self, request: &R) -> std::result::Result<(), ValidationErrors> {
        Validate::validate(request)
    }
}

type ErasedCheck = Box<dyn Fn(&dyn Any) -> std::result::Result<(), ValidationErrors> + Send + Sync>;

/// A validator erased to its request type, as stored in the container.
pub(crate) struct RegisteredValidator {
    request: TypeId,
    name: &'static str,
    check: ErasedCheck,
}

impl RegisteredValidator {
    fn new<R, V>(validator: V) -> Self
    where
        R: Request,
        V: RequestValidator<R>,
    {
        Self {
            request: TypeId::of::<R>(),
            name: std::any::type_name::<V>(),
            check: Box::new(move |request: &dyn Any| -> std::result::Result<(), ValidationErrors> {
                match request.downcast_ref::<R>() {
                    Some(request) => validator.validate(request),
                    None => Ok(()),
                }
            }),
        }
    }
}

impl Container {
    /// Register a validator for request type `R`.
    pub fn add_validator<R, V>(&mut self, validator: V) -> &mut Self
    where
        R: Request,
        V: RequestValidator<R>,
    {
        self.register(RegisteredValidator::new::<R, V>(validator))
    }

    /// Register `R`'s own [`Validate`] implementation as a validator.
    pub fn add_derived_validator<R>(&mut self) -> &mut Self
    where
        R: Request + Validate,
    {
        self.add_validator::<R, _>(DeriveValidator::<R>::new())
    }
}

/// Every validation failure collected for one request.
#[derive(Debug, Clone)]
pub struct ValidationFailures {
    request: &'static str,
    errors: Vec<ValidationErrors>,
}

impl ValidationFailures {
    /// Type name of the rejected request.
    pub fn request(&self) -> &'static str {
        self.request
    }

    /// Raw errors, one entry per failed validator.
    pub fn errors(&self) -> &[ValidationErrors] {
        &self.errors
    }

    /// Names of the failed fields, sorted and deduplicated.
    pub fn fields(&self) -> Vec<String> {
        self.errors
            .iter()
            .flat_map(|e| e.field_errors().into_keys().map(|k| k.to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rejected", self.request)?;
        let fields = self.fields();
        if !fields.is_empty() {
            write!(f, " (fields: {})", fields.join(", "))?;
        }
        Ok(())
    }
}

/// Decorator running the registered validators before the inner handler.
pub struct ValidationDecorator {
    validators: Vec<Arc<RegisteredValidator>>,
}

impl ValidationDecorator {
    /// Collect every validator registered in `resolver`.
    pub fn from_resolver(resolver: &dyn Resolver) -> Result<Self> {
        let validators = resolver.get_all::<RegisteredValidator>();
        debug!(validators = validators.len(), "Collected request validators");
        Ok(Self { validators })
    }

    /// Number of validators known to the decorator.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if no validator is registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    fn check(&self, request: &Envelope) -> std::result::Result<(), ValidationFailures> {
        let errors: Vec<ValidationErrors> = self
            .validators
            .iter()
            .filter(|v| v.request == request.type_id())
            .filter_map(|v| match (v.check)(request.as_any()) {
                Ok(()) => None,
                Err(e) => {
                    debug!(validator = v.name, request = request.type_name(), "Validator rejected request");
                    Some(e)
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailures {
                request: request.type_name(),
                errors,
            })
        }
    }
}

impl RequestDecorator for ValidationDecorator {
    fn handle<'a>(
        &'a self,
        request: Envelope,
        ctx: HandlerContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Envelope>> {
        if let Err(failures) = self.check(&request) {
            return Box::pin(async move { Err(MediatorError::Validation(failures)) });
        }
        next.run(request, ctx)
    }

    fn applies_to(&self, request: &RequestDescriptor) -> bool {
        self.validators
            .iter()
            .any(|v| v.request == request.type_id())
    }
}

impl MediatorBuilder {
    /// Register a validator for request type `R` in the builder's container.
    pub fn with_validator<R, V>(&mut self, validator: V) -> Result<&mut Self>
    where
        R: Request,
        V: RequestValidator<R>,
    {
        self.container_mut()?.add_validator::<R, V>(validator);
        Ok(self)
    }

    /// Install the validation decorator under the key `"validation"`.
    pub fn use_validation(&mut self) -> Result<&mut Self> {
        self.with_request_decorator(
            VALIDATION_KEY,
            HandlerType::describe_with::<ValidationDecorator, _>(ValidationDecorator::from_resolver)
                .decorates(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RequestHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use validator::ValidationError;

    #[derive(Debug, Validate)]
    struct CreateUser {
        #[validate(length(min = 1))]
        name: String,
        #[validate(range(min = 18))]
        age: u32,
    }

    impl Request for CreateUser {
        type Response = String;
    }

    #[derive(Debug)]
    struct Unchecked;

    impl Request for Unchecked {
        type Response = ();
    }

    #[derive(Default)]
    struct CreateUserHandler {
        calls: AtomicUsize,
    }

    impl RequestHandler<CreateUser> for CreateUserHandler {
        fn handle(&self, request: CreateUser, _ctx: HandlerContext) -> BoxFuture<'_, Result<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(format!("created {}", request.name)) })
        }
    }

    #[derive(Default)]
    struct UncheckedHandler;

    impl RequestHandler<Unchecked> for UncheckedHandler {
        fn handle(&self, _: Unchecked, _ctx: HandlerContext) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct ReservedNames;

    impl RequestValidator<CreateUser> for ReservedNames {
        fn validate(&self, request: &CreateUser) -> std::result::Result<(), ValidationErrors> {
            if request.name == "root" {
                let mut errors = ValidationErrors::new();
                errors.add("name", ValidationError::new("reserved"));
                return Err(errors);
            }
            Ok(())
        }
    }

    fn build() -> crate::Mediator {
        let mut container = Container::new();
        container.add_derived_validator::<CreateUser>();

        MediatorBuilder::new(container)
            .with_validator::<CreateUser, _>(ReservedNames)
            .unwrap()
            .with_request_handler(
                HandlerType::describe::<CreateUserHandler>().handles::<CreateUser>(),
            )
            .unwrap()
            .with_request_handler(HandlerType::describe::<UncheckedHandler>().handles::<Unchecked>())
            .unwrap()
            .use_validation()
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_reaches_handler() {
        let mediator = build();
        let out = mediator
            .send(CreateUser {
                name: "ada".into(),
                age: 36,
            })
            .await
            .unwrap();
        assert_eq!(out, "created ada");
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let mediator = build();
        let err = mediator
            .send(CreateUser {
                name: String::new(),
                age: 3,
            })
            .await
            .unwrap_err();

        let failures = match err {
            MediatorError::Validation(failures) => failures,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(failures.request().ends_with("CreateUser"));
        assert_eq!(failures.fields(), ["age", "name"]);
        assert_eq!(failures.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_all_validators_run() {
        let mediator = build();
        let err = mediator
            .send(CreateUser {
                name: "root".into(),
                age: 3,
            })
            .await
            .unwrap_err();

        let failures = match err {
            MediatorError::Validation(failures) => failures,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(failures.errors().len(), 2);
        assert_eq!(failures.fields(), ["age", "name"]);
        assert!(failures.to_string().contains("fields: age, name"));
    }

    #[test]
    fn test_decorator_only_wraps_validated_requests() {
        let mediator = build();
        let report = mediator.registrations();

        let validated = report
            .get_request(std::any::type_name::<CreateUser>())
            .unwrap();
        assert_eq!(validated.chain, [VALIDATION_KEY, "handler"]);

        let unchecked = report
            .get_request(std::any::type_name::<Unchecked>())
            .unwrap();
        assert_eq!(unchecked.chain, ["handler"]);
    }

    #[test]
    fn test_from_resolver_collects_validators() {
        let mut container = Container::new();
        assert!(ValidationDecorator::from_resolver(&container).unwrap().is_empty());

        container
            .add_derived_validator::<CreateUser>()
            .add_validator::<CreateUser, _>(ReservedNames);
        assert_eq!(ValidationDecorator::from_resolver(&container).unwrap().len(), 2);
    }

    #[test]
    fn test_with_validator_after_build_fails() {
        let mut builder = MediatorBuilder::default();
        builder.build().unwrap();

        assert!(matches!(
            builder.with_validator::<CreateUser, _>(ReservedNames),
            Err(MediatorError::InvalidState(_))
        ));
    }
}
