use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::connection::ProxySelector;
use crate::engine::NativeRequest;
use crate::protocol::ConfigError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(100);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(100);
pub const DEFAULT_THREAD_COUNT: usize = 4;

/// Adjusts the TLS configuration of a secure request.
pub type TlsHook = Arc<dyn Fn(&mut ClientConfig) + Send + Sync>;

/// Adjusts the transport level request before it is sent.
pub type NativeHook = Arc<dyn Fn(&mut NativeRequest) + Send + Sync>;

/// Configuration of an engine, immutable once built.
///
/// ```
/// use std::time::Duration;
/// use micro_client_engine::engine::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .read_timeout(Duration::ZERO)
///     .thread_count(2)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
/// assert_eq!(config.read_timeout(), None);
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    thread_count: usize,
    proxy: Option<Arc<dyn ProxySelector>>,
    tls_hook: Option<TlsHook>,
    request_customizer: Option<NativeHook>,
    transport_customizer: Option<NativeHook>,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// `None` when connecting may take forever.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// `None` when a read may take forever.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Worker threads of the dispatcher.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn proxy(&self) -> Option<&dyn ProxySelector> {
        self.proxy.as_deref()
    }

    pub fn tls_hook(&self) -> Option<&TlsHook> {
        self.tls_hook.as_ref()
    }

    pub fn request_customizer(&self) -> Option<&NativeHook> {
        self.request_customizer.as_ref()
    }

    pub fn transport_customizer(&self) -> Option<&NativeHook> {
        self.transport_customizer.as_ref()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            thread_count: DEFAULT_THREAD_COUNT,
            proxy: None,
            tls_hook: None,
            request_customizer: None,
            transport_customizer: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("thread_count", &self.thread_count)
            .field("proxy", &self.proxy.is_some())
            .field("tls_hook", &self.tls_hook.is_some())
            .field("request_customizer", &self.request_customizer.is_some())
            .field("transport_customizer", &self.transport_customizer.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    fn new() -> Self {
        Self { config: EngineConfig::default() }
    }

    /// `Duration::ZERO` disables the timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = non_zero(timeout);
        self
    }

    /// `Duration::ZERO` disables the timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = non_zero(timeout);
        self
    }

    pub fn thread_count(mut self, thread_count: usize) -> Self {
        self.config.thread_count = thread_count;
        self
    }

    pub fn proxy<P: ProxySelector + 'static>(mut self, proxy: P) -> Self {
        self.config.proxy = Some(Arc::new(proxy));
        self
    }

    /// Called with the TLS configuration of every `https` request.
    pub fn tls_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ClientConfig) + Send + Sync + 'static,
    {
        self.config.tls_hook = Some(Arc::new(hook));
        self
    }

    /// Called once method and headers are set, before the body framing is applied.
    pub fn request_customizer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut NativeRequest) + Send + Sync + 'static,
    {
        self.config.request_customizer = Some(Arc::new(hook));
        self
    }

    /// Called last, right before the transport is opened.
    pub fn transport_customizer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut NativeRequest) + Send + Sync + 'static,
    {
        self.config.transport_customizer = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        if self.config.thread_count == 0 {
            return Err(ConfigError::invalid_config("thread count must be greater than zero"));
        }
        Ok(self.config)
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}
