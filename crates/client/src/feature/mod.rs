//! Features: named units of client behaviour.
//!
//! A feature is installed into a [`FeatureScope`] every time a client is built or
//! derived. It contributes interceptors, attributes and the engine capabilities it
//! relies on. The key of a feature identifies it in a [`ClientConfig`](crate::ClientConfig),
//! installing a feature with a key already present replaces the old one.

mod default_request;
mod timeout;
mod user_agent;

pub use default_request::DefaultRequest;
pub use timeout::HttpTimeout;
pub use user_agent::UserAgent;

use std::borrow::Cow;
use std::fmt;

use micro_client_engine::engine::Capability;

use crate::interceptor::{Interceptor, Interceptors, InterceptorsBuilder};
use crate::{AttributeKey, Attributes};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey(Cow<'static, str>);

impl FeatureKey {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for FeatureKey {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FeatureKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Feature: Send + Sync {
    fn key(&self) -> FeatureKey;

    fn install(&self, scope: &mut FeatureScope);
}

/// What the installed features of one client contribute.
pub struct FeatureScope {
    interceptors: InterceptorsBuilder,
    attributes: Attributes,
    required: Vec<Capability>,
}

impl FeatureScope {
    pub(crate) fn new() -> Self {
        Self { interceptors: Interceptors::builder(), attributes: Attributes::new(), required: vec![] }
    }

    /// Runs `interceptor` after the ones added by features installed earlier.
    pub fn add_interceptor<I: Interceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        self.interceptors.add_last(interceptor);
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Shortcut for `attributes_mut().put(key, value)`.
    pub fn put<T: Send + Sync + 'static>(&mut self, key: AttributeKey<T>, value: T) -> &mut Self {
        self.attributes.put(key, value);
        self
    }

    /// Declares that the client only works with engines supporting `capability`.
    pub fn require(&mut self, capability: Capability) -> &mut Self {
        if !self.required.contains(&capability) {
            self.required.push(capability);
        }
        self
    }

    pub(crate) fn into_parts(self) -> (Interceptors, Attributes, Vec<Capability>) {
        (self.interceptors.build(), self.attributes, self.required)
    }
}

impl fmt::Debug for FeatureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureScope")
            .field("interceptors", &self.interceptors)
            .field("attributes", &self.attributes)
            .field("required", &self.required)
            .finish()
    }
}

/// A feature given by a name and an install closure.
pub(crate) struct FnFeature<F> {
    key: FeatureKey,
    install: F,
}

impl<F> FnFeature<F>
where
    F: Fn(&mut FeatureScope) + Send + Sync,
{
    pub(crate) fn new(key: FeatureKey, install: F) -> Self {
        Self { key, install }
    }
}

impl<F> Feature for FnFeature<F>
where
    F: Fn(&mut FeatureScope) + Send + Sync,
{
    fn key(&self) -> FeatureKey {
        self.key.clone()
    }

    fn install(&self, scope: &mut FeatureScope) {
        (self.install)(scope);
    }
}
