// vim: tw=80
//! Producing the stand-in objects that fakes are reached through.
//!
//! Generating proxies for arbitrary traits is the job of a [`ProxyGenerator`]
//! supplied from outside.  This module defines that seam, the options that
//! shape a request, and [`DynamicProxyGenerator`], a generator whose proxies
//! are called by member description instead of through a trait.

use std::{
    collections::HashMap,
    fmt,
    sync::Arc
};

use crate::{
    error::{ConfigurationError, DispatchError, GenerationFailure},
    fake::Fake,
    interception::{BasicCall, Interceptor},
    manager::Fallback,
    member::Member,
    value::{Argument, Value}
};

/// Whether the faked type is an interface (a trait) or a class with
/// constructors and, possibly, real method implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyKind {
    Interface,
    Class,
}

/// What a generator is asked to produce.
#[derive(Clone, Debug)]
pub struct ProxyRequest {
    type_name: String,
    kind: ProxyKind,
    additional_interfaces: Vec<String>,
    constructor_arguments: Option<Vec<Value>>,
}

impl ProxyRequest {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Extra interfaces the proxy must implement
    pub fn additional_interfaces(&self) -> &[String] {
        &self.additional_interfaces
    }

    /// Arguments for the faked class's constructor, if any were given.
    pub fn constructor_arguments(&self) -> Option<&[Value]> {
        self.constructor_arguments.as_deref()
    }
}

/// Builds proxies whose calls all go through an [`Interceptor`].
pub trait ProxyGenerator {
    type Proxy;

    /// Produce a proxy, or explain why it can't be done.  Failures are never
    /// retried.
    fn generate(&self, request: &ProxyRequest, interceptor: Interceptor)
        -> Result<Self::Proxy, GenerationFailure>;
}

type Configure<P> = Box<dyn FnOnce(&Fake<P>) -> Result<(), ConfigurationError>>;

/// Everything that shapes a new fake.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let name = Member::method("Person", "name").returns::<String>();
/// let n = name.clone();
/// let options = FakeOptions::<DynamicProxy>::for_interface("Person")
///     .implementing("Clone")
///     .configure(move |fake| {
///         fake.configure(&CallMatcher::new(&n))?
///             .returns(String::from("Bob"))?;
///         Ok(())
///     });
/// let fake = Fake::create(&DynamicProxyGenerator::new(), options).unwrap();
/// assert!(fake.implements("Clone"));
/// assert_eq!("Bob", fake.call_as::<String>(&name, values![]).unwrap());
/// ```
pub struct FakeOptions<P> {
    type_name: String,
    kind: ProxyKind,
    additional_interfaces: Vec<String>,
    constructor_arguments: Option<Vec<Value>>,
    configurations: Vec<Configure<P>>,
    fallback: Option<Fallback>,
}

impl<P> FakeOptions<P> {
    fn new(type_name: String, kind: ProxyKind) -> Self {
        FakeOptions {
            type_name,
            kind,
            additional_interfaces: Vec::new(),
            constructor_arguments: None,
            configurations: Vec::new(),
            fallback: None
        }
    }

    pub fn for_interface<S: Into<String>>(type_name: S) -> Self {
        Self::new(type_name.into(), ProxyKind::Interface)
    }

    pub fn for_class<S: Into<String>>(type_name: S) -> Self {
        Self::new(type_name.into(), ProxyKind::Class)
    }

    pub fn implementing<S: Into<String>>(mut self, interface: S) -> Self {
        self.additional_interfaces.push(interface.into());
        self
    }

    /// Only meaningful for classes.
    pub fn with_constructor_arguments(mut self, arguments: Vec<Value>) -> Self
    {
        self.constructor_arguments = Some(arguments);
        self
    }

    /// Run `f` on the new fake before it is handed out.  Actions run in the
    /// order they were added.
    pub fn configure<F>(mut self, f: F) -> Self
        where F: FnOnce(&Fake<P>) -> Result<(), ConfigurationError> + 'static
    {
        self.configurations.push(Box::new(f));
        self
    }

    /// Forward every call that no rule matches to the real implementation.
    pub fn wrapping(self) -> Self {
        self.with_fallback(Fallback::CallBase)
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub(crate) fn type_name(&self) -> &str {
        &self.type_name
    }

    pub(crate) fn request(&self) -> Result<ProxyRequest, ConfigurationError> {
        if self.kind == ProxyKind::Interface &&
            self.constructor_arguments.is_some()
        {
            return Err(ConfigurationError::ConstructorArgumentsForInterface);
        }
        Ok(ProxyRequest {
            type_name: self.type_name.clone(),
            kind: self.kind,
            additional_interfaces: self.additional_interfaces.clone(),
            constructor_arguments: self.constructor_arguments.clone()
        })
    }

    pub(crate) fn into_parts(self) -> (Option<Fallback>, Vec<Configure<P>>) {
        (self.fallback, self.configurations)
    }
}

impl<P> fmt::Debug for FakeOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FakeOptions")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("additional_interfaces", &self.additional_interfaces)
            .field("constructor_arguments", &self.constructor_arguments)
            .field("configurations", &self.configurations.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

type BaseFn = dyn Fn(&Member, &mut [Value]) -> Result<Option<Value>, DispatchError>
    + Send + Sync;

/// A class the [`DynamicProxyGenerator`] knows how to proxy.
#[derive(Clone)]
pub struct ClassInfo {
    name: String,
    sealed: bool,
    constructors: Vec<Vec<&'static str>>,
    base: Option<Arc<BaseFn>>,
}

impl ClassInfo {
    /// A class with only a default constructor.
    pub fn new<S: Into<String>>(name: S) -> Self {
        ClassInfo {
            name: name.into(),
            sealed: false,
            constructors: vec![Vec::new()],
            base: None
        }
    }

    /// A class that can't be derived from.
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// Replace the constructors with ones taking these argument types.  An
    /// empty signature is a default constructor.
    pub fn with_constructors(mut self, constructors: Vec<Vec<&'static str>>)
        -> Self
    {
        self.constructors = constructors;
        self
    }

    /// The real implementation of the class's members, used by rules and
    /// fallbacks that call the base method.
    pub fn with_base<F>(mut self, f: F) -> Self
        where F: Fn(&Member, &mut [Value])
                 -> Result<Option<Value>, DispatchError> + Send + Sync + 'static
    {
        self.base = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("sealed", &self.sealed)
            .field("constructors", &self.constructors)
            .finish()
    }
}

/// Generates [`DynamicProxy`]s.
///
/// Any interface can be proxied.  Classes must be registered first, so that
/// the generator knows their constructors and base implementation.
#[derive(Clone, Debug, Default)]
pub struct DynamicProxyGenerator {
    classes: HashMap<String, ClassInfo>,
}

impl DynamicProxyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    fn class(&self, request: &ProxyRequest)
        -> Result<Option<Arc<BaseFn>>, GenerationFailure>
    {
        let name = request.type_name();
        let class = self.classes.get(name)
            .ok_or_else(|| GenerationFailure::new(format!(
                "The type of proxy must be an interface or a class but it was {}.",
                name)))?;
        if class.sealed {
            return Err(GenerationFailure::new(format!(
                "The type of proxy \"{}\" is sealed.", name)));
        }
        match request.constructor_arguments() {
            None if !class.constructors.iter().any(Vec::is_empty) =>
                Err(GenerationFailure::new(format!(
                    "No usable default constructor was found on the type {}.",
                    name))),
            Some(args) if !class.constructors.iter().any(|c| {
                c.len() == args.len() &&
                    c.iter().zip(args).all(|(t, a)| *t == a.type_name())
            }) => Err(GenerationFailure::new(
                "No constructor matches the passed arguments for constructor.")),
            _ => Ok(class.base.clone())
        }
    }
}

impl ProxyGenerator for DynamicProxyGenerator {
    type Proxy = DynamicProxy;

    fn generate(&self, request: &ProxyRequest, interceptor: Interceptor)
        -> Result<DynamicProxy, GenerationFailure>
    {
        if request.type_name().is_empty() {
            return Err(GenerationFailure::new("No type name was given."));
        }
        let base = match request.kind() {
            ProxyKind::Interface => None,
            ProxyKind::Class => self.class(request)?
        };
        Ok(DynamicProxy {
            interceptor,
            type_name: request.type_name().to_owned(),
            interfaces: request.additional_interfaces().to_vec(),
            constructor_arguments: request.constructor_arguments()
                .map(<[Value]>::to_vec)
                .unwrap_or_default(),
            base
        })
    }
}

/// A proxy that is called by member description.
///
/// Useful for fakes of types that have no generated proxy, and for driving a
/// fake directly.
pub struct DynamicProxy {
    interceptor: Interceptor,
    type_name: String,
    interfaces: Vec<String>,
    constructor_arguments: Vec<Value>,
    base: Option<Arc<BaseFn>>,
}

impl DynamicProxy {
    pub(crate) fn new(interceptor: Interceptor, type_name: String) -> Self {
        DynamicProxy {
            interceptor,
            type_name,
            interfaces: Vec::new(),
            constructor_arguments: Vec::new(),
            base: None
        }
    }

    /// Call `member`, writing out and ref values back into `arguments`.
    pub fn call_mut(&self, member: &Member, arguments: &mut Vec<Value>)
        -> Result<Option<Value>, DispatchError>
    {
        let mut call = BasicCall::new(member, std::mem::take(arguments));
        if let Some(base) = &self.base {
            call = call.with_base(move |args| base(member, args));
        }
        let result = self.interceptor.intercept(&mut call);
        *arguments = call.into_arguments();
        result
    }

    /// Call `member`.  Out and ref values are only visible in the history.
    pub fn call(&self, member: &Member, mut arguments: Vec<Value>)
        -> Result<Option<Value>, DispatchError>
    {
        self.call_mut(member, &mut arguments)
    }

    /// Call `member` and downcast its return value.
    pub fn call_as<T: Argument + Clone>(&self, member: &Member,
                                        arguments: Vec<Value>)
        -> Result<T, DispatchError>
    {
        let mut call = BasicCall::new(member, arguments);
        if let Some(base) = &self.base {
            call = call.with_base(move |args| base(member, args));
        }
        self.interceptor.invoke::<T>(&mut call)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.type_name == interface || self.interfaces.iter().any(|i| i == interface)
    }

    /// The arguments the proxy was constructed with
    pub fn constructor_arguments(&self) -> &[Value] {
        &self.constructor_arguments
    }
}

impl fmt::Debug for DynamicProxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DynamicProxy")
            .field("type_name", &self.type_name)
            .field("interceptor", &self.interceptor)
            .finish()
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{manager::FakeManager, values};

    fn interceptor() -> Interceptor {
        Interceptor::new(Arc::new(FakeManager::new("T")))
    }

    fn request<P>(options: FakeOptions<P>) -> ProxyRequest {
        options.request().unwrap()
    }

    #[test]
    fn interface_with_constructor_arguments() {
        let options = FakeOptions::<DynamicProxy>::for_interface("Service")
            .with_constructor_arguments(values![1i32]);
        let e = options.request().unwrap_err();
        assert_eq!(ConfigurationError::ConstructorArgumentsForInterface, e);
        assert_eq!("Arguments for constructor specified for interface type.",
                   e.to_string());
    }

    #[test]
    fn unknown_class() {
        let r = request(FakeOptions::<DynamicProxy>::for_class("i32"));
        let e = DynamicProxyGenerator::new().generate(&r, interceptor())
            .unwrap_err();
        assert_eq!(
            "The type of proxy must be an interface or a class but it was i32.",
            e.reason());
    }

    #[test]
    fn sealed_class() {
        let g = DynamicProxyGenerator::new()
            .with_class(ClassInfo::new("Final").sealed());
        let r = request(FakeOptions::<DynamicProxy>::for_class("Final"));
        let e = g.generate(&r, interceptor()).unwrap_err();
        assert_eq!("The type of proxy \"Final\" is sealed.", e.reason());
    }

    #[test]
    fn no_default_constructor() {
        let g = DynamicProxyGenerator::new().with_class(
            ClassInfo::new("Point").with_constructors(vec![vec!["i32", "i32"]]));
        let r = request(FakeOptions::<DynamicProxy>::for_class("Point"));
        let e = g.generate(&r, interceptor()).unwrap_err();
        assert!(e.reason().starts_with("No usable default constructor"));
    }

    #[test]
    fn constructor_arguments() {
        let g = DynamicProxyGenerator::new().with_class(
            ClassInfo::new("Point").with_constructors(vec![vec!["i32", "i32"]]));
        let r = request(FakeOptions::<DynamicProxy>::for_class("Point")
            .with_constructor_arguments(values![1i32, 2i32]));
        let p = g.generate(&r, interceptor()).unwrap();
        assert_eq!(&values![1i32, 2i32][..], p.constructor_arguments());

        let r = request(FakeOptions::<DynamicProxy>::for_class("Point")
            .with_constructor_arguments(values![String::from("1")]));
        let e = g.generate(&r, interceptor()).unwrap_err();
        assert_eq!("No constructor matches the passed arguments for constructor.",
                   e.reason());
    }

    #[test]
    fn additional_interfaces() {
        let r = request(FakeOptions::<DynamicProxy>::for_interface("Reader")
            .implementing("Closeable"));
        let p = DynamicProxyGenerator::new().generate(&r, interceptor())
            .unwrap();
        assert!(p.implements("Reader"));
        assert!(p.implements("Closeable"));
        assert!(!p.implements("Writer"));
    }

    #[test]
    fn empty_type_name() {
        let r = request(FakeOptions::<DynamicProxy>::for_interface(""));
        let e = DynamicProxyGenerator::new().generate(&r, interceptor())
            .unwrap_err();
        assert_eq!("No type name was given.", e.reason());
    }
}
