use super::TokenFetchError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Subtracted from every advertised lifetime to absorb clock skew and
/// in-flight latency.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// Upper bound on how long a cached token is trusted, whatever the token
/// endpoint advertises.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A token as issued by the token endpoint, before it is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Duration,
}

/// Anything able to mint a fresh access token.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn fetch_token(&self) -> Result<TokenGrant, TokenFetchError>;
}

/// The cached bearer token together with the instant it stops being usable.
///
/// Both fields are only ever replaced together.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn from_grant(grant: TokenGrant, issued_at: Instant) -> Self {
        let lifetime = grant
            .expires_in
            .saturating_sub(EXPIRY_SAFETY_MARGIN)
            .min(MAX_TOKEN_LIFETIME);
        Self {
            value: grant.access_token,
            expires_at: issued_at + lifetime,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

// Keeps the token itself out of logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_in_secs: u64) -> TokenGrant {
        TokenGrant {
            access_token: "tok".to_string(),
            expires_in: Duration::from_secs(expires_in_secs),
        }
    }

    #[test]
    fn test_expiry_applies_safety_margin() {
        let issued_at = Instant::now();
        let token = AccessToken::from_grant(grant(60), issued_at);

        assert_eq!(token.expires_at(), issued_at + Duration::from_secs(55));
        assert!(token.is_valid_at(issued_at + Duration::from_secs(54)));
        assert!(!token.is_valid_at(issued_at + Duration::from_secs(55)));
        assert!(!token.is_valid_at(issued_at + Duration::from_secs(56)));
    }

    #[test]
    fn test_short_lifetime_is_already_expired() {
        let issued_at = Instant::now();
        let token = AccessToken::from_grant(grant(3), issued_at);

        assert_eq!(token.expires_at(), issued_at);
        assert!(!token.is_valid_at(issued_at));
    }

    #[test]
    fn test_huge_lifetime_is_capped() {
        let issued_at = Instant::now();
        let token = AccessToken::from_grant(grant(u64::MAX), issued_at);

        assert_eq!(token.expires_at(), issued_at + MAX_TOKEN_LIFETIME);
        assert!(token.is_valid_at(issued_at + Duration::from_secs(3600)));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::from_grant(grant(60), Instant::now());
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("tok\""));
        assert!(rendered.contains("<redacted>"));
    }
}
