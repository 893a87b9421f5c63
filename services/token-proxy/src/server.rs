use crate::config::ProxyConfig;
use crate::proxy::handler::ProxyHandler;
use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    handler: Arc<ProxyHandler>,
}

impl ProxyServer {
    /// Create a new proxy server
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let handler = Arc::new(ProxyHandler::new(config.clone())?);

        Ok(Self {
            config: Arc::new(config),
            handler,
        })
    }

    /// Run the proxy server
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .listen_addr()
            .parse()
            .context("Invalid listen address")?;

        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {}", addr))?;

        self.serve(listener).await
    }

    /// Accept connections from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Listener has no local address")?;

        info!(
            "Proxy server listening on {} (route mode: {:?}, backend: {})",
            addr, self.config.route_mode, self.config.backend_url
        );

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(handler, stream).await {
                    debug!("Connection error from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Handle a single connection
async fn handle_connection(handler: Arc<ProxyHandler>, stream: TcpStream) -> Result<()> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| {
        let handler = Arc::clone(&handler);
        async move { handler.handle_request(req).await }
    });

    http1::Builder::new()
        .serve_connection(io, service)
        .await
        .context("Failed to serve connection")?;

    Ok(())
}
