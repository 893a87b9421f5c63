use super::{TokenFetchError, TokenGrant, TokenSource, CLIENT_CREDENTIALS_GRANT};
use async_trait::async_trait;
use http::HeaderValue;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Client-credentials grant against a single OAuth token endpoint.
pub struct OAuthClient {
    http_client: Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            http_client,
            token_endpoint,
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl TokenSource for OAuthClient {
    #[instrument(skip(self), fields(endpoint = %self.token_endpoint))]
    async fn fetch_token(&self) -> Result<TokenGrant, TokenFetchError> {
        let request = TokenRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: CLIENT_CREDENTIALS_GRANT,
        };

        debug!("Requesting client-credentials token");

        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(TokenFetchError::from)?;

        let latency = start.elapsed();
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());

            warn!(
                status = status.as_u16(),
                latency_ms = latency.as_millis(),
                "Token endpoint rejected the request"
            );

            return Err(TokenFetchError::Rejected { status, body });
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            TokenFetchError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        if token_response.access_token.is_empty() {
            return Err(TokenFetchError::InvalidResponse(
                "access_token is empty".to_string(),
            ));
        }

        if HeaderValue::from_str(&token_response.access_token).is_err() {
            return Err(TokenFetchError::InvalidResponse(
                "access_token is not a valid header value".to_string(),
            ));
        }

        info!(
            expires_in_secs = token_response.expires_in,
            latency_ms = latency.as_millis(),
            "Access token issued"
        );

        Ok(TokenGrant {
            access_token: token_response.access_token,
            expires_in: Duration::from_secs(token_response.expires_in),
        })
    }
}
