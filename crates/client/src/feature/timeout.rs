use std::time::Duration;

use async_trait::async_trait;
use micro_client_engine::engine::Capability;

use crate::feature::{Feature, FeatureKey, FeatureScope};
use crate::interceptor::Interceptor;
use crate::{ClientError, HttpRequestBuilder};

/// Default timeouts for every request.
///
/// A timeout the request sets itself is kept. Installing this feature requires an
/// engine with [`Capability::Timeout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpTimeout {
    request: Option<Duration>,
    connect: Option<Duration>,
    socket: Option<Duration>,
}

impl HttpTimeout {
    pub const KEY: FeatureKey = FeatureKey::new("HttpTimeout");

    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the whole exchange, reading the response body included.
    pub fn request(mut self, timeout: Duration) -> Self {
        self.request = Some(timeout);
        self
    }

    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    /// Bounds every single read from the connection.
    pub fn socket(mut self, timeout: Duration) -> Self {
        self.socket = Some(timeout);
        self
    }
}

impl Feature for HttpTimeout {
    fn key(&self) -> FeatureKey {
        Self::KEY
    }

    fn install(&self, scope: &mut FeatureScope) {
        scope.require(Capability::Timeout).add_interceptor(*self);
    }
}

#[async_trait]
impl Interceptor for HttpTimeout {
    async fn on_request(&self, request: &mut HttpRequestBuilder) -> Result<(), ClientError> {
        let timeouts = request.timeouts_mut();
        timeouts.request = timeouts.request.or(self.request);
        timeouts.connect = timeouts.connect.or(self.connect);
        timeouts.socket = timeouts.socket.or(self.socket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fills_only_missing_timeouts() {
        let feature = HttpTimeout::new().request(Duration::from_secs(30)).socket(Duration::from_secs(5));

        let mut request = HttpRequestBuilder::new();
        request.timeouts_mut().socket = Some(Duration::from_secs(1));
        feature.on_request(&mut request).await.unwrap();

        let timeouts = request.timeouts();
        assert_eq!(timeouts.request, Some(Duration::from_secs(30)));
        assert_eq!(timeouts.connect, None);
        assert_eq!(timeouts.socket, Some(Duration::from_secs(1)));
    }

    #[test]
    fn requires_the_timeout_capability() {
        let mut scope = FeatureScope::new();
        HttpTimeout::new().install(&mut scope);

        let (interceptors, _, required) = scope.into_parts();
        assert_eq!(interceptors.len(), 1);
        assert_eq!(required, [Capability::Timeout]);
    }
}
