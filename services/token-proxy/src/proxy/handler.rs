use super::{ForwardedRequest, ProxyError, ProxyState};
use crate::config::ProxyConfig;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use std::convert::Infallible;
use tracing::{debug, error, info, instrument, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct ProxyHandler {
    state: ProxyState,
}

impl ProxyHandler {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let state = ProxyState::new(config)?;
        Ok(Self { state })
    }

    /// Relay one request. Every failure is turned into a response here, so
    /// the connection is never torn down because of a proxy error.
    #[instrument(
        skip(self, req),
        fields(
            request_id = %uuid::Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        )
    )]
    pub async fn handle_request<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let start = std::time::Instant::now();

        let response = match self.relay(req).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ProxyError::TokenFetch(cause) => {
                        error!(error = %cause, "Rejecting request: no access token")
                    }
                    ProxyError::BackendUnreachable(cause) => {
                        error!(error = %cause, "Backend unreachable")
                    }
                    other => warn!(error = %other, "Request rejected"),
                }
                e.to_response()
            }
        };

        info!(
            status = response.status().as_u16(),
            total_latency_ms = start.elapsed().as_millis(),
            "Request completed"
        );

        Ok(response)
    }

    async fn relay<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, ProxyError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        // Step 1: Resolve the backend path
        let path_and_query = self
            .state
            .config
            .route_mode
            .rewrite(req.uri())
            .ok_or_else(|| ProxyError::NoRoute(req.uri().path().to_string()))?;
        let url = self.state.backend_client.target_url(&path_and_query);

        // Step 2: Obtain a valid token
        debug!("Step 2: Obtaining access token");
        let token = self.state.token_cache.get_valid_token().await?;

        // Step 3: Buffer the inbound body
        let (parts, body) = req.into_parts();
        let limit = self.state.config.max_body_size_bytes;
        let body = Limited::new(body, limit)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    ProxyError::BodyTooLarge { limit }
                } else {
                    ProxyError::RequestBody(e.to_string())
                }
            })?
            .to_bytes();

        // Step 4: Forward and relay
        debug!(backend_url = %url, "Step 4: Forwarding request to backend");
        let forwarded = ForwardedRequest::new(parts.method, url, &parts.headers, &token, body)?;
        let relayed = self.state.backend_client.send(forwarded).await?;

        Ok(relayed.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteMode;
    use http::StatusCode;

    fn config(route_mode: RouteMode) -> ProxyConfig {
        // Nothing listens on port 9; any network attempt fails fast.
        ProxyConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            oauth_endpoint: "http://127.0.0.1:9/oauth/token".to_string(),
            backend_url: "http://127.0.0.1:9".to_string(),
            client_id: "proxy".to_string(),
            client_secret: "secret".to_string(),
            route_mode,
            request_timeout_secs: 1,
            token_timeout_secs: 1,
            max_body_size_bytes: 1024,
            backend_tls_insecure: false,
            log_level: "warn".to_string(),
        }
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_path_outside_prefix_is_not_found() {
        let handler = ProxyHandler::new(config(RouteMode::Prefix("/api".to_string()))).unwrap();

        let request = Request::get("/static/app.js")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler.handle_request(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_yields_fixed_500() {
        let handler = ProxyHandler::new(config(RouteMode::Passthrough)).unwrap();

        let request = Request::get("/widgets/7")
            .header("authorization", "Bearer client-supplied")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler.handle_request(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to obtain token");
    }
}
