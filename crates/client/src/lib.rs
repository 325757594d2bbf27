//! An async HTTP client on top of a pluggable engine.
//!
//! An [`HttpClient`] pairs an [`HttpClientEngine`](micro_client_engine::engine::HttpClientEngine),
//! which performs the exchanges, with a [`ClientConfig`]: the features installed on
//! the client. Features contribute [interceptors](interceptor::Interceptor) that see
//! every request and response, and [`Attributes`] others can look up.
//!
//! ```no_run
//! use micro_client::feature::{DefaultRequest, UserAgent};
//! use micro_client::{ClientConfig, HttpClient};
//! use micro_client_engine::engine::{EngineConfig, Http1Engine};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Http1Engine::new(EngineConfig::default())?;
//!
//! let mut config = ClientConfig::new();
//! config.install(UserAgent::default()).install(DefaultRequest::new(|request| {
//!     request.url_mut().set_host("example.com");
//! }));
//! let client = HttpClient::with_config(Arc::new(engine), config)?;
//!
//! let body = client.get("/").await?.text().await?;
//! println!("{body}");
//!
//! // same engine, one more feature
//! let api = client.config(|config| {
//!     config.install(DefaultRequest::new(|request| {
//!         request.url_mut().set_host("api.example.com");
//!     }));
//! })?;
//! # let _ = api;
//! # Ok(())
//! # }
//! ```

mod attributes;
mod client;
mod config;
mod error;
mod request;
mod response;

pub mod feature;
pub mod interceptor;

pub use attributes::{AttributeKey, Attributes};
pub use client::HttpClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use request::{HttpRequestBuilder, UrlBuilder};
pub use response::{HttpResponse, SentRequest};
