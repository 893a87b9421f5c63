mod cache;
mod client;
mod error;
mod token;

pub use cache::TokenCache;
pub use client::{OAuthClient, TokenRequest, TokenResponse};
pub use error::TokenFetchError;
pub use token::{AccessToken, TokenGrant, TokenSource, EXPIRY_SAFETY_MARGIN, MAX_TOKEN_LIFETIME};

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
