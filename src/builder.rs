//! Registration builder.
//!
//! The [`MediatorBuilder`] collects handler, decorator and notification
//! registrations against a [`Container`], then `build()` composes every
//! request chain once and returns the [`Mediator`].
//!
//! The builder has two states:
//!
//! ```text
//! Open ──build()──► Built
//! ```
//!
//! Every registration method and `build()` itself fail with
//! [`MediatorError::InvalidState`] once the builder is `Built`. The builder
//! is meant to be driven from one place during startup; its methods take
//! `&mut self`, so it cannot be mutated from several threads at once.
//!
//! # Example
//!
//! ```ignore
//! let mediator = Mediator::builder()
//!     .with_request_handler(HandlerType::describe::<PingHandler>().handles::<Ping>())?
//!     .with_request_decorator("audit", HandlerType::describe::<Audit>().decorates())?
//!     .use_logging()?
//!     .build()?;
//!
//! let pong = mediator.send(Ping::default()).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MediatorConfig;
use crate::container::{Container, ServiceKey};
use crate::error::{Capability, MediatorError, Result};
use crate::handler::component::{DecoratorFactory, NotificationBinding, RequestBinding};
use crate::handler::{HandlerModule, HandlerType};
use crate::mediator::Mediator;
use crate::pipeline::{DecoratorLayer, RequestChain};
use crate::report::RegistrationReport;

/// Lifecycle state of a [`MediatorBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Accepting registrations.
    Open,
    /// `build()` was called; terminal.
    Built,
}

/// A registered decorator, in registration order.
struct DecoratorRegistration {
    key: String,
    decorator_type: &'static str,
    factory: DecoratorFactory,
}

/// Builder for configuring and creating a [`Mediator`].
pub struct MediatorBuilder {
    container: Option<Container>,
    config: MediatorConfig,
    requests: Vec<RequestBinding>,
    notifications: Vec<NotificationBinding>,
    decorators: Vec<DecoratorRegistration>,
    state: BuilderState,
}

impl MediatorBuilder {
    /// Create a builder bound to `container`.
    ///
    /// The container may already hold services that handler factories
    /// resolve (connection pools, validators, ...).
    pub fn new(container: Container) -> Self {
        Self {
            container: Some(container),
            config: MediatorConfig::default(),
            requests: Vec::new(),
            notifications: Vec::new(),
            decorators: Vec::new(),
            state: BuilderState::Open,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Check if `build()` was already called.
    #[inline]
    pub fn is_built(&self) -> bool {
        self.state == BuilderState::Built
    }

    /// Replace the configuration.
    ///
    /// The handler key must be non-empty and must not collide with a
    /// decorator key registered earlier.
    pub fn with_config(&mut self, config: MediatorConfig) -> Result<&mut Self> {
        self.ensure_open("Cannot call with_config after build() has been called")?;

        if config.handler_key.is_empty()
            || self.decorators.iter().any(|d| d.key == config.handler_key)
        {
            return Err(MediatorError::DuplicateKey(config.handler_key));
        }

        self.config = config;
        Ok(self)
    }

    /// Register a request handler type.
    ///
    /// The type must declare at least one request capability
    /// (`HandlerType::describe::<H>().handles::<R>()`).
    pub fn with_request_handler(&mut self, handler_type: impl Into<HandlerType>) -> Result<&mut Self> {
        self.ensure_open("Cannot call with_request_handler after build() has been called")?;

        let handler_type = handler_type.into();
        if !handler_type.implements(Capability::RequestHandler) {
            return Err(MediatorError::ContractViolation {
                type_name: handler_type.name(),
                expected: Capability::RequestHandler,
            });
        }

        self.add_request_bindings(&handler_type);
        Ok(self)
    }

    /// Register every request handler type found in `modules`.
    ///
    /// Types without a request capability are skipped.
    pub fn with_request_handler_modules<'a, I>(&mut self, modules: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a HandlerModule>,
    {
        self.ensure_open("Cannot call with_request_handler_modules after build() has been called")?;

        for module in modules {
            let mut found = 0usize;
            for handler_type in module.types() {
                if !handler_type.implements(Capability::RequestHandler) {
                    continue;
                }
                self.add_request_bindings(handler_type);
                found += 1;
            }
            debug!(module = module.name(), found, "Scanned module for request handlers");
        }

        Ok(self)
    }

    /// Register a request decorator under `name`.
    ///
    /// The decorator wraps everything registered before it; the last
    /// decorator registered is the outermost.
    pub fn with_request_decorator(
        &mut self,
        name: impl Into<String>,
        decorator_type: impl Into<HandlerType>,
    ) -> Result<&mut Self> {
        self.ensure_open("Cannot call with_request_decorator after build() has been called")?;

        let name = name.into();
        let decorator_type = decorator_type.into();
        let Some(factory) = decorator_type.decorator_factory() else {
            return Err(MediatorError::ContractViolation {
                type_name: decorator_type.name(),
                expected: Capability::RequestDecorator,
            });
        };

        if name.is_empty()
            || name == self.config.handler_key
            || self.decorators.iter().any(|d| d.key == name)
        {
            return Err(MediatorError::DuplicateKey(name));
        }

        debug!(
            key = %name,
            wraps = %self.outermost_key(),
            decorator = decorator_type.name(),
            "Registered request decorator"
        );

        self.decorators.push(DecoratorRegistration {
            key: name,
            decorator_type: decorator_type.name(),
            factory: factory.clone(),
        });
        Ok(self)
    }

    /// Register a notification handler type.
    ///
    /// The type must declare at least one notification capability
    /// (`HandlerType::describe::<H>().listens::<N>()`).
    pub fn with_notification_handler(
        &mut self,
        handler_type: impl Into<HandlerType>,
    ) -> Result<&mut Self> {
        self.ensure_open("Cannot call with_notification_handler after build() has been called")?;

        let handler_type = handler_type.into();
        if !handler_type.implements(Capability::NotificationHandler) {
            return Err(MediatorError::ContractViolation {
                type_name: handler_type.name(),
                expected: Capability::NotificationHandler,
            });
        }

        self.add_notification_bindings(&handler_type);
        Ok(self)
    }

    /// Register every notification handler type found in `modules`.
    ///
    /// Types without a notification capability are skipped.
    pub fn with_notification_handler_modules<'a, I>(&mut self, modules: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a HandlerModule>,
    {
        self.ensure_open(
            "Cannot call with_notification_handler_modules after build() has been called",
        )?;

        for module in modules {
            let mut found = 0usize;
            for handler_type in module.types() {
                if !handler_type.implements(Capability::NotificationHandler) {
                    continue;
                }
                self.add_notification_bindings(handler_type);
                found += 1;
            }
            debug!(module = module.name(), found, "Scanned module for notification handlers");
        }

        Ok(self)
    }

    /// Finalise all registrations and return the mediator.
    ///
    /// This will:
    /// 1. Instantiate every decorator once
    /// 2. Compose one chain per request type (handler innermost)
    /// 3. Instantiate every notification subscriber
    /// 4. Install chains and subscribers into the container
    ///
    /// Can only be called once; the builder is `Built` afterwards even if a
    /// factory fails.
    pub fn build(&mut self) -> Result<Mediator> {
        self.ensure_open("build() can only be called once")?;
        self.state = BuilderState::Built;

        let mut container = self.container.take().unwrap_or_default();

        let layers = self
            .decorators
            .iter()
            .map(|registration| -> Result<DecoratorLayer> {
                let decorator = (registration.factory)(&container)?;
                debug!(
                    key = %registration.key,
                    decorator = registration.decorator_type,
                    "Instantiated decorator"
                );
                Ok(DecoratorLayer {
                    key: registration.key.clone(),
                    decorator,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = RegistrationReport::new();

        let mut chains = Vec::with_capacity(self.requests.len());
        for binding in &self.requests {
            let handler = (binding.factory)(&container)?;
            let chain = RequestChain::compose(
                binding.descriptor,
                binding.handler,
                &self.config.handler_key,
                handler,
                &layers,
            );
            report.add_request(
                chain.descriptor().request_name(),
                chain.descriptor().response_name(),
                chain.handler_name(),
                chain.keys().to_vec(),
            );
            chains.push(chain);
        }

        let mut subscribers = Vec::with_capacity(self.notifications.len());
        for binding in &self.notifications {
            let subscriber = (binding.factory)(&container)?;
            report.add_subscriber(binding.notification, binding.handler);
            subscribers.push((binding.key, subscriber));
        }

        for chain in chains {
            let key = ServiceKey::Request(chain.descriptor().type_id());
            container.insert(key, Arc::new(chain));
        }
        for (key, subscriber) in subscribers {
            container.insert(key, subscriber);
        }

        debug!(
            requests = report.requests.len(),
            notifications = report.notifications.len(),
            decorators = layers.len(),
            "Mediator built"
        );

        Ok(Mediator::new(Arc::new(container), self.config.clone(), report))
    }

    /// Container the builder registers into, while still Open.
    pub(crate) fn container_mut(&mut self) -> Result<&mut Container> {
        self.ensure_open("Cannot modify the container after build() has been called")?;
        Ok(self.container.get_or_insert_with(Container::new))
    }

    fn ensure_open(&self, message: &'static str) -> Result<()> {
        match self.state {
            BuilderState::Open => Ok(()),
            BuilderState::Built => Err(MediatorError::InvalidState(message)),
        }
    }

    fn outermost_key(&self) -> &str {
        self.decorators
            .last()
            .map(|d| d.key.as_str())
            .unwrap_or(&self.config.handler_key)
    }

    fn add_request_bindings(&mut self, handler_type: &HandlerType) {
        for binding in handler_type.request_bindings() {
            let request = binding.descriptor.request_name();
            if let Some(pos) = self
                .requests
                .iter()
                .position(|b| b.descriptor == binding.descriptor)
            {
                let replaced = self.requests.remove(pos);
                warn!(
                    request,
                    previous = replaced.handler,
                    handler = binding.handler,
                    "Replacing request handler"
                );
            }

            debug!(request, handler = binding.handler, "Registered request handler");
            self.requests.push(binding.clone());
        }
    }

    fn add_notification_bindings(&mut self, handler_type: &HandlerType) {
        for binding in handler_type.notification_bindings() {
            debug!(
                notification = binding.notification,
                handler = binding.handler,
                "Registered notification handler"
            );
            self.notifications.push(binding.clone());
        }
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new(Container::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, HandlerContext, Request, RequestHandler};
    use crate::pipeline::{Envelope, Next, RequestDecorator};

    #[derive(Debug)]
    struct Ping;

    impl Request for Ping {
        type Response = &'static str;
    }

    #[derive(Default)]
    struct PingHandler;

    impl RequestHandler<Ping> for PingHandler {
        fn handle(&self, _: Ping, _ctx: HandlerContext) -> BoxFuture<'_, Result<&'static str>> {
            Box::pin(async { Ok("pong") })
        }
    }

    #[derive(Default)]
    struct PongHandler;

    impl RequestHandler<Ping> for PongHandler {
        fn handle(&self, _: Ping, _ctx: HandlerContext) -> BoxFuture<'_, Result<&'static str>> {
            Box::pin(async { Ok("second") })
        }
    }

    #[derive(Default)]
    struct PassThrough;

    impl RequestDecorator for PassThrough {
        fn handle<'a>(
            &'a self,
            request: Envelope,
            ctx: HandlerContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, Result<Envelope>> {
            next.run(request, ctx)
        }
    }

    fn ping_handler() -> HandlerType {
        HandlerType::describe::<PingHandler>().handles::<Ping>().build()
    }

    #[test]
    fn test_builder_starts_open() {
        let builder = MediatorBuilder::default();
        assert_eq!(builder.state(), BuilderState::Open);
        assert!(!builder.is_built());
    }

    #[test]
    fn test_build_twice_fails() {
        let mut builder = MediatorBuilder::default();
        builder.build().unwrap();

        assert!(builder.is_built());
        assert!(matches!(builder.build(), Err(MediatorError::InvalidState(_))));
    }

    #[test]
    fn test_registration_after_build_fails() {
        let mut builder = MediatorBuilder::default();
        builder.build().unwrap();

        assert!(matches!(
            builder.with_request_handler(ping_handler()),
            Err(MediatorError::InvalidState(_))
        ));
        assert!(matches!(
            builder.with_request_decorator("d", HandlerType::describe::<PassThrough>().decorates()),
            Err(MediatorError::InvalidState(_))
        ));
        assert!(matches!(
            builder.with_request_handler_modules([&HandlerModule::new("m")]),
            Err(MediatorError::InvalidState(_))
        ));
        assert!(matches!(
            builder.with_notification_handler_modules([&HandlerModule::new("m")]),
            Err(MediatorError::InvalidState(_))
        ));
        assert!(matches!(
            builder.with_config(MediatorConfig::default()),
            Err(MediatorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_invalid_state_checked_before_contract() {
        let mut builder = MediatorBuilder::default();
        builder.build().unwrap();

        // A type without the capability still reports the state error first.
        let plain = HandlerType::describe::<PingHandler>();
        assert!(matches!(
            builder.with_notification_handler(plain),
            Err(MediatorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_contract_violations() {
        let mut builder = MediatorBuilder::default();

        let err = builder
            .with_request_handler(HandlerType::describe::<PassThrough>())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            MediatorError::ContractViolation {
                expected: Capability::RequestHandler,
                ..
            }
        ));

        let err = builder
            .with_request_decorator("d", ping_handler())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            MediatorError::ContractViolation {
                expected: Capability::RequestDecorator,
                ..
            }
        ));

        let err = builder.with_notification_handler(ping_handler()).err().unwrap();
        assert!(matches!(
            err,
            MediatorError::ContractViolation {
                expected: Capability::NotificationHandler,
                ..
            }
        ));

        assert_eq!(builder.state(), BuilderState::Open);
    }

    #[test]
    fn test_duplicate_decorator_keys() {
        let mut builder = MediatorBuilder::default();
        let deco = || HandlerType::describe::<PassThrough>().decorates();

        builder.with_request_decorator("one", deco()).unwrap();

        assert!(matches!(
            builder.with_request_decorator("one", deco()),
            Err(MediatorError::DuplicateKey(_))
        ));
        assert!(matches!(
            builder.with_request_decorator("", deco()),
            Err(MediatorError::DuplicateKey(_))
        ));
        assert!(matches!(
            builder.with_request_decorator("handler", deco()),
            Err(MediatorError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_handler_key_cannot_reuse_decorator_key() {
        let mut builder = MediatorBuilder::default();
        builder
            .with_request_handler(ping_handler())
            .unwrap()
            .with_request_decorator("inner", HandlerType::describe::<PassThrough>().decorates())
            .unwrap();

        assert!(matches!(
            builder.with_config(MediatorConfig::new().handler_key("inner")),
            Err(MediatorError::DuplicateKey(key)) if key == "inner"
        ));
        assert!(matches!(
            builder.with_config(MediatorConfig::new().handler_key("")),
            Err(MediatorError::DuplicateKey(_))
        ));

        let mediator = builder.build().unwrap();
        let route = mediator
            .registrations()
            .get_request(std::any::type_name::<Ping>())
            .unwrap();
        assert_eq!(route.chain, ["inner", "handler"]);
    }

    #[test]
    fn test_chain_keys_in_report() {
        let mediator = MediatorBuilder::default()
            .with_request_handler(ping_handler())
            .unwrap()
            .with_request_decorator("one", HandlerType::describe::<PassThrough>().decorates())
            .unwrap()
            .with_request_decorator("two", HandlerType::describe::<PassThrough>().decorates())
            .unwrap()
            .build()
            .unwrap();

        let route = mediator
            .registrations()
            .get_request(std::any::type_name::<Ping>())
            .unwrap();
        assert_eq!(route.chain, ["two", "one", "handler"]);
        assert!(route.handler.ends_with("PingHandler"));
    }

    #[tokio::test]
    async fn test_last_request_handler_wins() {
        let mediator = MediatorBuilder::default()
            .with_request_handler(ping_handler())
            .unwrap()
            .with_request_handler(HandlerType::describe::<PongHandler>().handles::<Ping>())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(mediator.send(Ping).await.unwrap(), "second");
        assert_eq!(mediator.registrations().requests.len(), 1);
    }

    #[test]
    fn test_custom_handler_key() {
        let mediator = MediatorBuilder::default()
            .with_config(MediatorConfig::new().handler_key("inner"))
            .unwrap()
            .with_request_handler(ping_handler())
            .unwrap()
            .build()
            .unwrap();

        let route = mediator
            .registrations()
            .get_request(std::any::type_name::<Ping>())
            .unwrap();
        assert_eq!(route.chain, ["inner"]);
    }

    #[test]
    fn test_factory_failure_leaves_builder_built() {
        struct Missing;

        let failing = HandlerType::describe_with::<PingHandler, _>(|resolver| {
            use crate::container::ResolverExt;
            resolver.require::<Missing>().map(|_| PingHandler)
        })
        .handles::<Ping>();

        let mut builder = MediatorBuilder::default();
        builder.with_request_handler(failing).unwrap();

        assert!(matches!(builder.build(), Err(MediatorError::MissingService(_))));
        assert!(builder.is_built());
    }
}
