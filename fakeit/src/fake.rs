// vim: tw=80
//! The handle test code holds on a faked instance.

use std::{
    fmt,
    ops::Deref,
    sync::Arc
};

use tracing::debug;

use crate::{
    assertion::CallAssertion,
    call::FakeId,
    configuration::{RuleGuard, SetterGuard},
    constraint::CallMatcher,
    error::{ConfigurationError, Error, GenerationFailure},
    history::CallRecord,
    interception::Interceptor,
    manager::{Fallback, FakeManager},
    member::Member,
    proxy::{DynamicProxy, FakeOptions, ProxyGenerator}
};

/// A faked instance: a proxy of type `P` plus the engine behind it.
///
/// Derefs to the proxy, so the fake can be used wherever a `&P` is
/// expected.
pub struct Fake<P> {
    proxy: P,
    manager: Arc<FakeManager>,
}

impl<P> Fake<P> {
    /// Build a fake with a proxy generator.
    pub fn create<G>(generator: &G, options: FakeOptions<P>)
        -> Result<Self, Error>
        where G: ProxyGenerator<Proxy = P>
    {
        let request = options.request()?;
        Self::create_with(|i| generator.generate(&request, i), options)
    }

    /// Build a fake with a closure standing in for the proxy generator.
    /// Handy for hand-written proxies.
    pub fn create_with<F>(f: F, options: FakeOptions<P>)
        -> Result<Self, Error>
        where F: FnOnce(Interceptor) -> Result<P, GenerationFailure>
    {
        // Misconfigured options fail before anything gets generated
        options.request()?;
        let manager = Arc::new(FakeManager::new(options.type_name()));
        let proxy = f(Interceptor::new(manager.clone())).map_err(|e| {
            debug!(type_name = options.type_name(), "generation failed: {}", e);
            e
        })?;
        let (fallback, configurations) = options.into_parts();
        if let Some(fallback) = fallback {
            manager.set_fallback(fallback);
        }
        let fake = Fake{proxy, manager};
        for configure in configurations {
            configure(&fake)?;
        }
        debug!(fake = %fake.id(), "created a fake {}", fake.manager.type_name());
        Ok(fake)
    }

    pub fn id(&self) -> FakeId {
        self.manager.id()
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    pub fn manager(&self) -> &Arc<FakeManager> {
        &self.manager
    }

    /// A matcher for every call to `member` on this fake.
    pub fn call_to(&self, member: &Member) -> CallMatcher {
        CallMatcher::new(member).on(self.id())
    }

    /// Add a rule for calls accepted by `matcher`.  The newest matching rule
    /// wins.
    pub fn configure(&self, matcher: &CallMatcher)
        -> Result<RuleGuard<'_>, ConfigurationError>
    {
        RuleGuard::new(&self.manager, matcher)
    }

    /// Add a rule for assignments to a property.
    pub fn configure_setter(&self, matcher: &CallMatcher)
        -> Result<SetterGuard<'_>, ConfigurationError>
    {
        SetterGuard::new(&self.manager, matcher)
    }

    pub fn set_fallback(&self, fallback: Fallback) {
        self.manager.set_fallback(fallback)
    }

    /// Start an assertion about calls made to this fake.
    pub fn assert_that(&self, matcher: &CallMatcher) -> CallAssertion {
        CallAssertion::new(matcher, self.manager.history().clone())
    }

    /// Every call made to this fake so far, oldest first.
    pub fn recorded_calls(&self) -> Vec<Arc<CallRecord>> {
        self.manager.history().snapshot()
    }

    pub fn clear_recorded_calls(&self) {
        self.manager.history().clear()
    }
}

impl Fake<DynamicProxy> {
    /// A fake of an interface that is called through a [`DynamicProxy`].
    pub fn dynamic<S: Into<String>>(type_name: S) -> Self {
        let type_name = type_name.into();
        let manager = Arc::new(FakeManager::new(type_name.clone()));
        let proxy = DynamicProxy::new(Interceptor::new(manager.clone()),
                                      type_name);
        Fake{proxy, manager}
    }
}

impl<P> Deref for Fake<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.proxy
    }
}

impl<P> fmt::Debug for Fake<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Fake")
            .field("id", &self.manager.id())
            .field("type_name", &self.manager.type_name())
            .finish()
    }
}
