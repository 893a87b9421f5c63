use crate::oauth::TokenFetchError;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use thiserror::Error;

pub const TOKEN_FAILURE_MESSAGE: &str = "Failed to obtain token";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Failed to obtain token: {0}")]
    TokenFetch(#[from] TokenFetchError),

    #[error("Backend request failed: {0}")]
    BackendUnreachable(String),

    #[error("Request body exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    #[error("No route for path {0}")]
    NoRoute(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::TokenFetch(_) | ProxyError::BackendUnreachable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message shown to the caller.
    ///
    /// Token failures always render the same fixed text; their cause only goes
    /// to the logs.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::TokenFetch(_) => TOKEN_FAILURE_MESSAGE.to_string(),
            ProxyError::BackendUnreachable(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_response(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.client_message())));
        *response.status_mut() = self.status_code();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::BackendUnreachable(err.to_string())
    }
}
