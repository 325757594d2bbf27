//! Hooks around every request of a client.

use std::fmt;

use async_trait::async_trait;

use crate::{ClientError, HttpRequestBuilder, HttpResponse};

/// Observes or adjusts requests before they are sent and responses before they are returned.
///
/// An error returned from either hook fails the call.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_request(&self, _request: &mut HttpRequestBuilder) -> Result<(), ClientError> {
        Ok(())
    }

    async fn on_response(&self, _response: &mut HttpResponse) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Interceptors run one after another, in the order they were added.
pub struct Interceptors {
    inner: Vec<Box<dyn Interceptor>>,
}

#[async_trait]
impl Interceptor for Interceptors {
    async fn on_request(&self, request: &mut HttpRequestBuilder) -> Result<(), ClientError> {
        for interceptor in &self.inner {
            interceptor.on_request(request).await?;
        }
        Ok(())
    }

    async fn on_response(&self, response: &mut HttpResponse) -> Result<(), ClientError> {
        for interceptor in &self.inner {
            interceptor.on_response(response).await?;
        }
        Ok(())
    }
}

impl Interceptors {
    pub fn builder() -> InterceptorsBuilder {
        InterceptorsBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors").field("len", &self.inner.len()).finish()
    }
}

pub struct InterceptorsBuilder {
    inner: Vec<Box<dyn Interceptor>>,
}

impl InterceptorsBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<I: Interceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        self.inner.push(Box::new(interceptor));
        self
    }

    pub fn add_first<I: Interceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        self.inner.insert(0, Box::new(interceptor));
        self
    }

    pub fn build(self) -> Interceptors {
        Interceptors { inner: self.inner }
    }
}

impl fmt::Debug for InterceptorsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorsBuilder").field("len", &self.inner.len()).finish()
    }
}
