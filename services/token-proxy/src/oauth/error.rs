use http::StatusCode;
use thiserror::Error;

/// Failure to obtain an access token from the token endpoint.
///
/// `Clone` so one refresh outcome can be handed to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum TokenFetchError {
    #[error("Token endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Token endpoint rejected the request (status {status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Invalid response from token endpoint: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TokenFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TokenFetchError::InvalidResponse(err.to_string())
        } else {
            TokenFetchError::Unreachable(err.to_string())
        }
    }
}
