use std::env;
use std::time::Duration;

use http_body_util::BodyExt;
use micro_client::feature::{HttpTimeout, UserAgent};
use micro_client::{ClientConfig, HttpClient};
use micro_client_engine::engine::{EngineConfig, Http1Engine};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// cargo run --example get -- https://example.com/
#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let url = env::args().nth(1).unwrap_or_else(|| "http://example.com/".to_owned());

    let engine_config = match EngineConfig::builder().connect_timeout(Duration::from_secs(5)).build() {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid engine config");
            return;
        }
    };
    let engine = match Http1Engine::new(engine_config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(cause = %e, "failed to start engine");
            return;
        }
    };

    let mut config = ClientConfig::new();
    config.install(UserAgent::default()).install(HttpTimeout::new().request(Duration::from_secs(10)));
    let client = match HttpClient::with_config(Arc::new(engine), config) {
        Ok(client) => client,
        Err(e) => {
            error!(cause = %e, "failed to create client");
            return;
        }
    };

    let response = match client.get(&url).await {
        Ok(response) => response,
        Err(e) => {
            error!(cause = %e, %url, "request failed");
            return;
        }
    };
    info!(status = %response.status(), version = ?response.version(), "received response");
    for (name, value) in response.headers() {
        info!("{}: {:?}", name, value);
    }

    let mut body = response.into_body();
    let mut total = 0;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    total += data.len();
                }
            }
            Err(e) => {
                error!(cause = %e, "failed to read body");
                return;
            }
        }
    }
    info!(bytes = total, "body read");

    client.close();
}
