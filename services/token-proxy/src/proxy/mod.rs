mod error;
pub(crate) mod handler;
mod route;
mod upstream;

pub use error::{ProxyError, TOKEN_FAILURE_MESSAGE};
pub use handler::ProxyHandler;
pub use upstream::{BackendClient, ForwardedRequest, RelayedResponse};

use crate::config::ProxyConfig;
use crate::oauth::{OAuthClient, TokenCache};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<ProxyConfig>,
    pub token_cache: Arc<TokenCache>,
    pub backend_client: Arc<BackendClient>,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let oauth_client = OAuthClient::new(
            config.oauth_endpoint.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            config.token_timeout(),
        )?;
        let token_cache = Arc::new(TokenCache::new(Arc::new(oauth_client)));
        let backend_client = Arc::new(BackendClient::new(
            config.backend_url.clone(),
            config.request_timeout(),
            config.backend_tls_insecure,
        )?);

        Ok(Self {
            config: Arc::new(config),
            token_cache,
            backend_client,
        })
    }
}
