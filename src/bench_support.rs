use anyhow::{Context, Result};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use token_relay_proxy::config::{ProxyConfig, RouteMode};
use token_relay_proxy::server::ProxyServer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub use token_relay_proxy;

pub const BENCH_TOKEN: &str = "bench-token";
const TOKEN_PATH: &str = "/oauth/token";

/// A running proxy wired to mock token and backend servers.
pub struct RelayFixture {
    pub oauth: MockServer,
    pub backend: MockServer,
    pub proxy_url: String,
    handle: JoinHandle<Result<()>>,
}

impl RelayFixture {
    pub async fn start(route_mode: RouteMode) -> Result<Self> {
        let oauth = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": BENCH_TOKEN,
                "expires_in": 3600
            })))
            .mount(&oauth)
            .await;

        let backend = MockServer::start().await;

        let config = ProxyConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            oauth_endpoint: format!("{}{}", oauth.uri(), TOKEN_PATH),
            backend_url: backend.uri(),
            client_id: "bench-client".to_string(),
            client_secret: "bench-secret".to_string(),
            route_mode,
            request_timeout_secs: 5,
            token_timeout_secs: 5,
            max_body_size_bytes: 1024 * 1024,
            backend_tls_insecure: false,
            log_level: "error".to_string(),
        };
        config.validate()?;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding bench proxy listener")?;
        let proxy_url = format!("http://{}", listener.local_addr()?);
        let server = ProxyServer::new(config)?;
        let handle = tokio::spawn(async move { server.serve(listener).await });

        Ok(Self {
            oauth,
            backend,
            proxy_url,
            handle,
        })
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.proxy_url, route)
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
