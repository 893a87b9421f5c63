use anyhow::{Context, Result};
use token_relay_proxy::config::ProxyConfig;
use token_relay_proxy::server::ProxyServer;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ProxyConfig::from_env().context("Failed to load configuration")?;

    // Initialize tracing with the configured log level
    init_tracing(&config.log_level);

    info!("token-relay-proxy service starting");

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    log_relay_settings(&config);

    // Create and start server
    let server = ProxyServer::new(config).context("Failed to create proxy server")?;

    // Run server with graceful shutdown
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
        }
    }

    info!("token-relay-proxy service stopped");
    Ok(())
}

fn log_relay_settings(config: &ProxyConfig) {
    info!(
        listen = %config.listen_addr(),
        route_mode = %config.route_mode,
        backend = %config.backend_url,
        "Relay configured"
    );
    info!(
        token_endpoint = %config.oauth_endpoint,
        client_id = %config.client_id,
        token_timeout_secs = config.token_timeout_secs,
        request_timeout_secs = config.request_timeout_secs,
        max_body_size_bytes = config.max_body_size_bytes,
        "Token refresh configured"
    );

    if config.backend_tls_insecure {
        warn!("BACKEND_TLS_INSECURE is set: backend certificates will not be verified");
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
