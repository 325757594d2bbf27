use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use http::Request;
use rustls::{ClientConfig, RootCertStore};
use tokio::runtime::{Handle, Runtime};
use tokio::select;
use tokio::time::timeout_at;
use tracing::{debug, trace};

use crate::connection::connector::{self, Endpoint};
use crate::connection::{ClientConnection, proxy};
use crate::content::OutgoingContent;
use crate::content::bridge::write_body;
use crate::content::framing::{computed_headers, merge_headers, resolve_framing};
use crate::engine::{Capability, EngineConfig, HttpClientEngine, NativeRequest};
use crate::protocol::{
    CallContext, ConfigError, ConnectError, Deadline, HttpError, PayloadSize, RequestData, RequestHead, ResponseData, ResponseHead,
};
use crate::utils::AbortOnDrop;

/// An HTTP/1.1 engine: one transport per exchange, plain or TLS, optionally through
/// an HTTP proxy.
///
/// Every exchange runs as a task on the engine's own multi-thread runtime, sized by
/// [`EngineConfig::thread_count`]. Dropping the engine shuts that runtime down.
pub struct Http1Engine {
    config: EngineConfig,
    runtime: Mutex<Option<Runtime>>,
    dispatcher: Handle,
    closed: AtomicBool,
    tls: ClientConfig,
}

impl Http1Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.thread_count())
            .thread_name("micro-client-dispatcher")
            .enable_all()
            .build()?;
        let dispatcher = runtime.handle().clone();

        Ok(Self { config, runtime: Mutex::new(Some(runtime)), dispatcher, closed: AtomicBool::new(false), tls: default_tls_config()? })
    }

    /// Builds the transport level request, running every configured hook.
    ///
    /// Fails before any transport is opened when the request can't be sent as described.
    pub fn configure(&self, request: &RequestData) -> Result<NativeRequest, ConfigError> {
        let framing = resolve_framing(request.method(), request.headers(), request.body())?;
        let endpoint = Endpoint::from_uri(request.url())?;
        let proxy = self.config.proxy().and_then(|selector| selector.select(request.url()));

        let mut native = NativeRequest::new(request.url().clone(), endpoint.is_secure(), proxy);

        native.set_connect_timeout(self.config.connect_timeout());
        native.set_read_timeout(self.config.read_timeout());
        if let Some(timeouts) = request.timeouts() {
            if let Some(connect) = timeouts.connect {
                native.set_connect_timeout(Some(connect));
            }
            if let Some(socket) = timeouts.socket {
                native.set_read_timeout(Some(socket));
            }
            native.set_request_timeout(timeouts.request);
        }

        if endpoint.is_secure() {
            let mut tls = self.tls.clone();
            if let Some(hook) = self.config.tls_hook() {
                hook(&mut tls);
            }
            native.set_tls_config(tls);
        }

        native.set_method(request.method().clone());
        *native.headers_mut() = merge_headers(computed_headers(request.url(), request.body())?, request.headers());

        if let Some(customizer) = self.config.request_customizer() {
            customizer(&mut native);
        }

        native.set_framing(framing);

        if let Some(customizer) = self.config.transport_customizer() {
            customizer(&mut native);
        }

        Ok(native)
    }
}

#[async_trait]
impl HttpClientEngine for Http1Engine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn dispatcher(&self) -> Handle {
        self.dispatcher.clone()
    }

    fn supported_capabilities(&self) -> &[Capability] {
        &[Capability::Timeout]
    }

    async fn execute(&self, request: RequestData) -> Result<ResponseData, HttpError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConfigError::EngineClosed.into());
        }

        debug!(method = %request.method(), url = %request.url(), "configuring request");
        let native = self.configure(&request)?;

        let mut exchange = AbortOnDrop(self.dispatcher.spawn(exchange(native, request)));
        match (&mut exchange.0).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(_) if self.closed.load(Ordering::Acquire) => Err(ConfigError::EngineClosed.into()),
            Err(_) => Err(HttpError::Cancelled),
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
        debug!("engine closed");
    }
}

impl fmt::Debug for Http1Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http1Engine").field("config", &self.config).field("closed", &self.closed).finish_non_exhaustive()
    }
}

impl Drop for Http1Engine {
    fn drop(&mut self) {
        // a runtime can't be dropped from within an async context, don't wait for its workers
        if let Some(runtime) = self.runtime.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            runtime.shutdown_background();
        }
    }
}

/// Runs on the dispatcher: sends the request and waits for the final response head.
///
/// The request timeout starts here and keeps running while the body is read.
async fn exchange(native: NativeRequest, request: RequestData) -> Result<ResponseData, HttpError> {
    let context = request.context().clone();
    let deadline = native.request_timeout().map(Deadline::after);
    let request_time = SystemTime::now();

    let result = select! {
        biased;
        () = context.cancelled() => Err(HttpError::Cancelled),
        result = async {
            let send = send_request(native, request.into_body(), &context);
            match deadline {
                Some(deadline) => timeout_at(deadline.at(), send)
                    .await
                    .unwrap_or_else(|_| Err(ConnectError::from(deadline.error()).into())),
                None => send.await,
            }
        } => result,
    };

    match result {
        Ok((mut connection, head, payload_size)) => {
            trace!(state = "streaming_response", status = %head.status(), ?payload_size);
            if let Some(deadline) = deadline {
                connection.set_deadline(deadline);
            }
            let body = connection.into_body(payload_size, context.clone());
            Ok(ResponseData::new(head, request_time, body, context))
        }
        Err(e) => {
            debug!(state = "failed", cause = %e, "exchange failed");
            Err(e)
        }
    }
}

async fn send_request(
    mut native: NativeRequest,
    content: OutgoingContent,
    context: &CallContext,
) -> Result<(ClientConnection, ResponseHead, PayloadSize), HttpError> {
    let endpoint = Endpoint::from_uri(native.url())?;
    let framing = native.framing().unwrap_or(PayloadSize::Empty);

    trace!(state = "sending", %endpoint);
    let tls = native.take_tls_config().map(Arc::new);
    let io = connector::open(&endpoint, native.proxy(), native.connect_timeout(), tls).await?;

    let mut connection = ClientConnection::new(io, native.method(), native.read_timeout());
    connection.send_head(request_head(&native), framing).await.map_err(ConnectError::from)?;
    write_body(content, &mut connection.payload_sink(), context).await?;

    trace!(state = "awaiting_response");
    let (head, payload_size) = connection.read_head().await?;
    Ok((connection, head, payload_size))
}

fn request_head(native: &NativeRequest) -> RequestHead {
    let mut head = Request::new(());
    *head.method_mut() = native.method().clone();
    *head.uri_mut() = proxy::request_target(native.url(), native.proxy());
    *head.headers_mut() = native.headers().clone();
    head
}

fn default_tls_config() -> Result<ClientConfig, ConfigError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(ConfigError::tls)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Proxy;
    use crate::protocol::RequestTimeouts;
    use http::{HeaderMap, HeaderValue, Method, header};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn post(url: &str, body: OutgoingContent) -> RequestData {
        RequestData::new(Method::POST, url.parse().unwrap(), HeaderMap::new(), body, CallContext::new())
    }

    #[test]
    fn hooks_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (tls_order, request_order, transport_order) = (order.clone(), order.clone(), order.clone());

        let config = EngineConfig::builder()
            .tls_hook(move |_tls| tls_order.lock().unwrap().push("tls"))
            .request_customizer(move |native| {
                assert_eq!(native.method(), Method::POST);
                assert!(native.headers().contains_key(header::HOST));
                assert_eq!(native.framing(), None);
                request_order.lock().unwrap().push("request");
            })
            .transport_customizer(move |native| {
                assert_eq!(native.framing(), Some(PayloadSize::Length(5)));
                transport_order.lock().unwrap().push("transport");
            })
            .build()
            .unwrap();
        let engine = Http1Engine::new(config).unwrap();

        engine.configure(&post("https://example.com/items", OutgoingContent::bytes("hello"))).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["tls", "request", "transport"]);

        order.lock().unwrap().clear();
        engine.configure(&post("http://example.com/items", OutgoingContent::bytes("hello"))).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["request", "transport"]);
    }

    #[test]
    fn timeouts_and_overrides() {
        let config = EngineConfig::builder().connect_timeout(Duration::from_secs(3)).read_timeout(Duration::ZERO).build().unwrap();
        let engine = Http1Engine::new(config).unwrap();

        let native = engine.configure(&RequestData::get("http://example.com/".parse().unwrap())).unwrap();
        assert_eq!(native.connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(native.read_timeout(), None);
        assert_eq!(native.request_timeout(), None);
        assert!(native.tls_config().is_none());

        let timeouts = RequestTimeouts { request: Some(Duration::from_secs(9)), socket: Some(Duration::from_secs(1)), connect: None };
        let request = RequestData::get("https://example.com/".parse().unwrap()).with_timeouts(timeouts);
        let native = engine.configure(&request).unwrap();
        assert_eq!(native.connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(native.read_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(native.request_timeout(), Some(Duration::from_secs(9)));
        assert!(native.tls_config().is_some());
    }

    #[test]
    fn proxy_is_selected_once_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let config = EngineConfig::builder()
            .proxy(move |_target: &http::Uri| {
                counted.fetch_add(1, Ordering::SeqCst);
                Some(Proxy::http("http://gateway:3128").unwrap())
            })
            .build()
            .unwrap();
        let engine = Http1Engine::new(config).unwrap();

        let native = engine.configure(&RequestData::get("http://example.com/a?b=c".parse().unwrap())).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(native.proxy().map(Proxy::host), Some("gateway"));
        assert_eq!(request_head(&native).uri().to_string(), "http://example.com/a?b=c");
    }

    #[test]
    fn explicit_headers_reach_the_native_request() {
        let engine = Http1Engine::new(EngineConfig::default()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("custom/1.0"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        let request = RequestData::new(Method::GET, "http://example.com:8080/".parse().unwrap(), headers, OutgoingContent::NoContent, CallContext::new());

        let native = engine.configure(&request).unwrap();
        assert_eq!(native.headers()[header::USER_AGENT], "custom/1.0");
        assert_eq!(native.headers()[header::CONNECTION], "keep-alive");
        assert_eq!(native.headers()[header::HOST], "example.com:8080");
        assert_eq!(native.framing(), Some(PayloadSize::Empty));
    }

    #[test]
    fn misconfigured_requests_fail_before_connecting() {
        let engine = Http1Engine::new(EngineConfig::default()).unwrap();

        let body_on_get =
            RequestData::new(Method::GET, "http://example.com/".parse().unwrap(), HeaderMap::new(), OutgoingContent::bytes("x"), CallContext::new());
        assert!(matches!(engine.configure(&body_on_get), Err(ConfigError::BodyNotAllowed { .. })));

        let unsupported_scheme = post("ftp://example.com/", OutgoingContent::NoContent);
        assert!(matches!(engine.configure(&unsupported_scheme), Err(ConfigError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn closed_engine_refuses_calls() {
        let engine = Http1Engine::new(EngineConfig::default()).unwrap();
        engine.close();
        engine.close();

        let error = engine.execute(RequestData::get("http://127.0.0.1:9/".parse().unwrap())).await.unwrap_err();
        assert!(matches!(error, HttpError::Configuration { source: ConfigError::EngineClosed }));
    }
}
