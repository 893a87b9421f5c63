use super::{AccessToken, TokenFetchError, TokenSource};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type RefreshFuture = Shared<BoxFuture<'static, Result<String, TokenFetchError>>>;

#[derive(Default)]
struct CacheState {
    token: Option<AccessToken>,
    refresh: Option<RefreshFuture>,
}

/// Process-wide holder of the bearer token.
///
/// Refreshes are single-flight: while one is outstanding, every caller that
/// finds no usable token awaits that same refresh and receives its outcome.
/// Callers holding a still-valid token never touch the refresh.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    state: Arc<Mutex<CacheState>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return a token that is valid right now, refreshing it if needed.
    pub async fn get_valid_token(&self) -> Result<String, TokenFetchError> {
        let refresh = {
            let mut state = lock(&self.state);

            if let Some(token) = state.token.as_ref() {
                if token.is_valid_at(Instant::now()) {
                    return Ok(token.value().to_string());
                }
            }

            match state.refresh.as_ref() {
                Some(in_flight) => {
                    debug!("Joining in-flight token refresh");
                    in_flight.clone()
                }
                None => {
                    let refresh = self.start_refresh();
                    state.refresh = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    fn start_refresh(&self) -> RefreshFuture {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        info!("Refreshing access token");

        async move {
            let result = source.fetch_token().await;

            // Runs once per refresh, on whichever caller drives the shared future.
            let mut state = lock(&state);
            state.refresh = None;

            match result {
                Ok(grant) => {
                    let token = AccessToken::from_grant(grant, Instant::now());
                    if !token.is_valid_at(Instant::now()) {
                        warn!("Token endpoint issued a lifetime shorter than the safety margin");
                    }
                    let value = token.value().to_string();
                    state.token = Some(token);
                    Ok(value)
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed");
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
