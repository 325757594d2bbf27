use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::feature::{Feature, FeatureKey, FeatureScope};
use crate::interceptor::Interceptor;
use crate::{ClientError, HttpRequestBuilder};

type Defaults = Arc<dyn Fn(&mut HttpRequestBuilder) + Send + Sync>;

/// Applies a closure to every request before it is sent.
///
/// ```
/// use micro_client::feature::DefaultRequest;
///
/// let defaults = DefaultRequest::new(|request| {
///     request.url_mut().set_port(8080).set_path("api");
/// });
/// # let _ = defaults;
/// ```
#[derive(Clone)]
pub struct DefaultRequest {
    defaults: Defaults,
}

impl DefaultRequest {
    pub const KEY: FeatureKey = FeatureKey::new("DefaultRequest");

    pub fn new<F>(defaults: F) -> Self
    where
        F: Fn(&mut HttpRequestBuilder) + Send + Sync + 'static,
    {
        Self { defaults: Arc::new(defaults) }
    }
}

impl Feature for DefaultRequest {
    fn key(&self) -> FeatureKey {
        Self::KEY
    }

    fn install(&self, scope: &mut FeatureScope) {
        scope.add_interceptor(DefaultRequestInterceptor { defaults: Arc::clone(&self.defaults) });
    }
}

impl fmt::Debug for DefaultRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultRequest")
    }
}

struct DefaultRequestInterceptor {
    defaults: Defaults,
}

#[async_trait]
impl Interceptor for DefaultRequestInterceptor {
    async fn on_request(&self, request: &mut HttpRequestBuilder) -> Result<(), ClientError> {
        (self.defaults)(request);
        Ok(())
    }
}
