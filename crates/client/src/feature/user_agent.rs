use async_trait::async_trait;
use http::HeaderValue;
use http::header::USER_AGENT;

use crate::feature::{Feature, FeatureKey, FeatureScope};
use crate::interceptor::Interceptor;
use crate::{ClientError, HttpRequestBuilder};

/// Sends a `user-agent` header with every request that doesn't set one itself.
#[derive(Debug, Clone)]
pub struct UserAgent {
    agent: HeaderValue,
}

impl UserAgent {
    pub const KEY: FeatureKey = FeatureKey::new("UserAgent");

    pub fn new(agent: HeaderValue) -> Self {
        Self { agent }
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self::new(HeaderValue::from_static(concat!("micro-client/", env!("CARGO_PKG_VERSION"))))
    }
}

impl Feature for UserAgent {
    fn key(&self) -> FeatureKey {
        Self::KEY
    }

    fn install(&self, scope: &mut FeatureScope) {
        scope.add_interceptor(self.clone());
    }
}

#[async_trait]
impl Interceptor for UserAgent {
    async fn on_request(&self, request: &mut HttpRequestBuilder) -> Result<(), ClientError> {
        if !request.headers().contains_key(USER_AGENT) {
            request.headers_mut().insert(USER_AGENT, self.agent.clone());
        }
        Ok(())
    }
}
