use std::fmt;
use std::sync::Arc;

use http::Method;
use micro_client_engine::content::OutgoingContent;
use micro_client_engine::engine::{Capability, HttpClientEngine};
use micro_client_engine::protocol::RequestData;
use tracing::{debug, trace, warn};

use crate::feature::FeatureScope;
use crate::interceptor::{Interceptor, Interceptors};
use crate::response::SentRequest;
use crate::{Attributes, ClientConfig, ClientError, HttpRequestBuilder, HttpResponse};

/// A client: an engine plus the features installed on top of it.
///
/// Clients are cheap to clone, clones share everything. [`config`](Self::config)
/// derives a client with more or other features that still runs on the same engine.
#[derive(Clone)]
pub struct HttpClient {
    engine: Arc<dyn HttpClientEngine>,
    config: ClientConfig,
    interceptors: Arc<Interceptors>,
    attributes: Arc<Attributes>,
}

impl HttpClient {
    /// A client without features.
    pub fn new<E: HttpClientEngine + 'static>(engine: E) -> Result<Self, ClientError> {
        Self::with_config(Arc::new(engine), ClientConfig::new())
    }

    /// Fails if a feature requires a capability the engine lacks.
    pub fn with_config(engine: Arc<dyn HttpClientEngine>, config: ClientConfig) -> Result<Self, ClientError> {
        let mut scope = FeatureScope::new();
        config.install_into(&mut scope);
        let (interceptors, attributes, required) = scope.into_parts();

        for capability in required {
            check_capability(engine.as_ref(), capability)?;
        }

        debug!(features = ?config, "client created");
        Ok(Self { engine, config, interceptors: Arc::new(interceptors), attributes: Arc::new(attributes) })
    }

    /// Derives a client from this one.
    ///
    /// `configure` starts from a copy of this client's features. Every feature is
    /// installed again into the new client, which shares this client's engine. This
    /// client is left untouched.
    pub fn config<F>(&self, configure: F) -> Result<HttpClient, ClientError>
    where
        F: FnOnce(&mut ClientConfig),
    {
        let mut config = self.config.clone();
        configure(&mut config);
        Self::with_config(Arc::clone(&self.engine), config)
    }

    pub fn engine(&self) -> &dyn HttpClientEngine {
        self.engine.as_ref()
    }

    pub fn features(&self) -> &ClientConfig {
        &self.config
    }

    /// The attributes put by the installed features.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Sends the request described by `request`.
    ///
    /// Resolves once the response head has arrived, the body is read from the
    /// returned response.
    pub async fn execute(&self, mut request: HttpRequestBuilder) -> Result<HttpResponse, ClientError> {
        self.interceptors.on_request(&mut request).await?;

        let request = request.build()?;
        if request.timeouts().is_some() {
            check_capability(self.engine.as_ref(), Capability::Timeout)?;
        }
        let sent = SentRequest { method: request.method().clone(), url: request.url().clone() };
        trace!(method = %sent.method, url = %sent.url, "sending request");

        let data = match self.engine.execute(request).await {
            Ok(data) => data,
            Err(e) => {
                warn!(method = %sent.method, url = %sent.url, cause = %e, "request failed");
                return Err(e.into());
            }
        };

        let mut response = HttpResponse::new(sent, data);
        trace!(status = %response.status(), "received response head");
        self.interceptors.on_response(&mut response).await?;
        Ok(response)
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, ClientError> {
        self.request(Method::GET, url, OutgoingContent::NoContent).await
    }

    pub async fn post(&self, url: &str, body: impl Into<OutgoingContent>) -> Result<HttpResponse, ClientError> {
        self.request(Method::POST, url, body.into()).await
    }

    pub async fn request(&self, method: Method, url: &str, body: OutgoingContent) -> Result<HttpResponse, ClientError> {
        let mut request = HttpRequestBuilder::new();
        request.set_method(method).set_url(url)?.set_body(body);
        self.execute(request).await
    }

    /// Closes the engine, shared with every client derived from this one.
    pub fn close(&self) {
        self.engine.close();
    }
}

fn check_capability(engine: &dyn HttpClientEngine, capability: Capability) -> Result<(), ClientError> {
    if engine.supported_capabilities().contains(&capability) {
        Ok(())
    } else {
        Err(ClientError::UnsupportedCapability { capability })
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeKey;
    use crate::feature::{DefaultRequest, FeatureKey, HttpTimeout};
    use async_trait::async_trait;
    use http::{HeaderMap, StatusCode, Version};
    use micro_client_engine::engine::EngineConfig;
    use micro_client_engine::protocol::body::ResponseBody;
    use micro_client_engine::protocol::{HttpError, ResponseData, ResponseHead};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, SystemTime};
    use tokio::runtime::Handle;

    const CUSTOM: AttributeKey<bool> = AttributeKey::new("customFeature");
    const ANOTHER_CUSTOM: AttributeKey<bool> = AttributeKey::new("anotherCustomFeature");

    /// Answers every request with an empty 200 and remembers what it was asked.
    #[derive(Default)]
    struct RecordingEngine {
        config: EngineConfig,
        capabilities: Vec<Capability>,
        requests: Mutex<Vec<RequestData>>,
        closed: AtomicBool,
    }

    impl RecordingEngine {
        fn with_timeouts() -> Self {
            Self { capabilities: vec![Capability::Timeout], ..Self::default() }
        }

        fn last_path(&self) -> String {
            let requests = self.requests.lock().unwrap();
            requests.last().unwrap().url().path().to_owned()
        }
    }

    #[async_trait]
    impl HttpClientEngine for RecordingEngine {
        fn config(&self) -> &EngineConfig {
            &self.config
        }

        fn dispatcher(&self) -> Handle {
            Handle::current()
        }

        fn supported_capabilities(&self) -> &[Capability] {
            &self.capabilities
        }

        async fn execute(&self, request: RequestData) -> Result<ResponseData, HttpError> {
            let context = request.context().clone();
            self.requests.lock().unwrap().push(request);

            let mut head = ResponseHead::new(());
            *head.status_mut() = StatusCode::OK;
            *head.version_mut() = Version::HTTP_11;
            Ok(ResponseData::new(head, SystemTime::now(), ResponseBody::empty(), context))
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn original_config() -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .install(DefaultRequest::new(|request| {
                request.url_mut().set_port(8080).set_path("empty");
            }))
            .install_fn("customFeature", |scope| {
                scope.put(CUSTOM, true);
            });
        config
    }

    #[tokio::test]
    async fn derived_client_keeps_features_and_overrides_by_key() {
        let engine = Arc::new(RecordingEngine::default());
        let original = HttpClient::with_config(engine.clone(), original_config()).unwrap();

        let response = original.execute(HttpRequestBuilder::new()).await.unwrap();
        assert_eq!(response.request().full_path(), "/empty");
        assert_eq!(response.request().url.port_u16(), Some(8080));
        assert!(original.attributes().contains(CUSTOM));

        let derived = original
            .config(|config| {
                config
                    .install(DefaultRequest::new(|request| {
                        request.url_mut().set_port(8080).set_path("hello");
                    }))
                    .install_fn("anotherCustomFeature", |scope| {
                        scope.put(ANOTHER_CUSTOM, true);
                    });
            })
            .unwrap();

        let response = derived.execute(HttpRequestBuilder::new()).await.unwrap();
        assert_eq!(response.request().full_path(), "/hello");
        assert!(derived.attributes().contains(CUSTOM));
        assert!(derived.attributes().contains(ANOTHER_CUSTOM));

        let keys: Vec<_> = derived.features().keys().map(FeatureKey::as_str).collect();
        assert_eq!(keys, ["DefaultRequest", "customFeature", "anotherCustomFeature"]);

        // the parent is untouched
        original.execute(HttpRequestBuilder::new()).await.unwrap();
        assert_eq!(engine.last_path(), "/empty");
        assert!(!original.attributes().contains(ANOTHER_CUSTOM));
        assert_eq!(original.features().len(), 2);
    }

    #[tokio::test]
    async fn deriving_without_changes_behaves_like_the_parent() {
        let engine = Arc::new(RecordingEngine::default());
        let original = HttpClient::with_config(engine.clone(), original_config()).unwrap();
        let derived = original.config(|_| {}).unwrap();

        derived.execute(HttpRequestBuilder::new()).await.unwrap();
        assert_eq!(engine.last_path(), "/empty");
        let parent_keys: Vec<_> = original.features().keys().collect();
        let derived_keys: Vec<_> = derived.features().keys().collect();
        assert_eq!(parent_keys, derived_keys);
    }

    #[test]
    fn timeout_feature_needs_a_capable_engine() {
        let mut config = ClientConfig::new();
        config.install(HttpTimeout::new().request(Duration::from_secs(1)));

        let error = HttpClient::with_config(Arc::new(RecordingEngine::default()), config.clone()).unwrap_err();
        assert!(matches!(error, ClientError::UnsupportedCapability { capability: Capability::Timeout }));

        assert!(HttpClient::with_config(Arc::new(RecordingEngine::with_timeouts()), config).is_ok());
    }

    #[tokio::test]
    async fn request_timeouts_need_a_capable_engine() {
        let client = HttpClient::new(RecordingEngine::default()).unwrap();

        let mut request = HttpRequestBuilder::new();
        request.timeouts_mut().request = Some(Duration::from_secs(1));
        let error = client.execute(request).await.unwrap_err();
        assert!(matches!(error, ClientError::UnsupportedCapability { .. }));
    }

    #[tokio::test]
    async fn timeouts_reach_the_engine() {
        let engine = Arc::new(RecordingEngine::with_timeouts());
        let mut config = ClientConfig::new();
        config.install(HttpTimeout::new().connect(Duration::from_secs(3)));
        let client = HttpClient::with_config(engine.clone(), config).unwrap();

        client.get("http://localhost/").await.unwrap();

        let requests = engine.requests.lock().unwrap();
        let timeouts = requests[0].timeouts().unwrap();
        assert_eq!(timeouts.connect, Some(Duration::from_secs(3)));
        assert_eq!(timeouts.request, None);
    }

    #[tokio::test]
    async fn post_carries_the_body() {
        let engine = Arc::new(RecordingEngine::default());
        let client = HttpClient::with_config(engine.clone(), ClientConfig::new()).unwrap();

        let response = client.post("http://localhost/items", "payload").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.request().method, Method::POST);
        assert!(response.bytes().await.unwrap().is_empty());

        let requests = engine.requests.lock().unwrap();
        assert_eq!(requests[0].body().content_length(), Some(7));
        assert_eq!(requests[0].headers(), &HeaderMap::new());
    }

    #[tokio::test]
    async fn close_reaches_the_shared_engine() {
        let engine = Arc::new(RecordingEngine::default());
        let client = HttpClient::with_config(engine.clone(), ClientConfig::new()).unwrap();
        let derived = client.config(|_| {}).unwrap();

        derived.close();
        assert!(engine.closed.load(Ordering::SeqCst));
    }
}
