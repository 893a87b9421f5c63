use super::ProxyError;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Headers that describe a single connection and never cross the proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// One inbound request, rewritten for the backend.
#[derive(Debug)]
pub struct ForwardedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardedRequest {
    /// Copy the inbound headers and replace `Authorization` with the bearer token.
    ///
    /// Every value of a repeated header is kept. `Host`, `Content-Length` and
    /// hop-by-hop headers are left for the HTTP client to regenerate.
    pub fn new(
        method: Method,
        url: String,
        inbound_headers: &HeaderMap,
        token: &str,
        body: Bytes,
    ) -> Result<Self, ProxyError> {
        let mut headers = HeaderMap::with_capacity(inbound_headers.len() + 1);

        for (name, value) in inbound_headers.iter() {
            if name == AUTHORIZATION || name == HOST || name == CONTENT_LENGTH {
                continue;
            }
            if is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ProxyError::TokenFetch(crate::oauth::TokenFetchError::InvalidResponse(
                "access_token is not a valid header value".to_string(),
            ))
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// A backend response, success or error, copied through untouched.
#[derive(Debug)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RelayedResponse {
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            if is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        response
    }
}

pub struct BackendClient {
    http_client: Client,
    backend_base_url: String,
}

impl BackendClient {
    pub fn new(backend_url: String, timeout: Duration, tls_insecure: bool) -> anyhow::Result<Self> {
        if tls_insecure {
            warn!(
                backend_url = %backend_url,
                "TLS certificate validation toward the backend is DISABLED"
            );
        }

        // Redirects are relayed to the caller, never followed here.
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(20)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(tls_insecure)
            .build()?;

        Ok(Self {
            http_client,
            backend_base_url: backend_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full backend URL for an already rewritten path-and-query.
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.backend_base_url, path_and_query)
    }

    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: ForwardedRequest) -> Result<RelayedResponse, ProxyError> {
        debug!("Forwarding request to backend");

        let mut backend_req = self
            .http_client
            .request(request.method, &request.url)
            .headers(request.headers);

        if !request.body.is_empty() {
            backend_req = backend_req.body(request.body);
        }

        let start = std::time::Instant::now();

        let backend_response = backend_req.send().await.map_err(ProxyError::from)?;

        let status = backend_response.status();
        let headers = backend_response.headers().clone();

        let body = backend_response.bytes().await.map_err(ProxyError::from)?;

        info!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis(),
            response_size_bytes = body.len(),
            "Backend response received"
        );

        Ok(RelayedResponse {
            status,
            headers,
            body,
        })
    }
}
