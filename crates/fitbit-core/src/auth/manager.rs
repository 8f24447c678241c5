use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    AuthFlowController, AuthOutcome, CallbackParams, MemorySessionStorage, OAuthClient,
    SessionStorage, Token, TokenStore,
};
use crate::error::{FitbitError, FitbitResult};

/// What to do when a call finds no token or an expired one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Start the authorization flow when no token is held; otherwise fail with `TokenMissing`.
    pub auto_request: bool,
    /// Refresh an expired token before the call; otherwise fail with `TokenExpired`.
    pub auto_refresh: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_request: true,
            auto_refresh: true,
        }
    }
}

/// Owns the token and applies the missing/expired policy before each call.
///
/// The store lock is held across the expiry check and the refresh, so
/// concurrent calls on one manager refresh at most once per expiry.
pub struct TokenManager {
    store: Mutex<TokenStore>,
    flow: AuthFlowController,
    session: Arc<dyn SessionStorage>,
    inbound: CallbackParams,
    options: ClientOptions,
}

impl TokenManager {
    pub fn new(oauth: OAuthClient, options: ClientOptions) -> Self {
        Self {
            store: Mutex::new(TokenStore::new()),
            flow: AuthFlowController::new(oauth),
            session: Arc::new(MemorySessionStorage::new()),
            inbound: CallbackParams::default(),
            options,
        }
    }

    pub fn with_session_storage(mut self, session: Arc<dyn SessionStorage>) -> Self {
        self.session = session;
        self
    }

    pub fn with_flow(mut self, flow: AuthFlowController) -> Self {
        self.flow = flow;
        self
    }

    /// Query parameters of the request currently being served, consulted when
    /// the flow runs automatically.
    pub fn set_callback_params(&mut self, params: CallbackParams) {
        self.inbound = params;
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn flow(&self) -> &AuthFlowController {
        &self.flow
    }

    pub fn oauth(&self) -> &OAuthClient {
        self.flow.oauth()
    }

    /// Run one step of the authorization flow; a completed exchange replaces the held token.
    pub async fn authorize(&self, params: &CallbackParams) -> FitbitResult<AuthOutcome> {
        let outcome = self.flow.run(params, self.session.as_ref()).await?;
        if let AuthOutcome::Authorized(token) = &outcome {
            self.store.lock().await.replace(token.clone());
            info!(user_id = ?token.user_id, "authorization complete");
        }
        Ok(outcome)
    }

    /// Serialized token, requesting one first when allowed.
    pub async fn token(&self) -> FitbitResult<String> {
        let mut store = self.store.lock().await;
        self.acquire_if_missing(&mut store).await?;
        store.get_serialized()
    }

    pub async fn set_token(&self, serialized: &str) -> FitbitResult<()> {
        self.store.lock().await.set(serialized)
    }

    pub async fn replace_token(&self, token: Token) {
        self.store.lock().await.replace(token);
    }

    pub async fn current(&self) -> Option<Token> {
        self.store.lock().await.get().cloned()
    }

    pub async fn has_token_expired(&self) -> FitbitResult<bool> {
        self.store.lock().await.is_expired()
    }

    pub async fn access_token(&self) -> FitbitResult<String> {
        Ok(self.store.lock().await.access_token()?.to_owned())
    }

    pub async fn refresh_token(&self) -> FitbitResult<String> {
        Ok(self.store.lock().await.refresh_token()?.to_owned())
    }

    pub async fn token_expiry(&self) -> FitbitResult<DateTime<Utc>> {
        self.store.lock().await.expires_at()
    }

    /// Exchange the held refresh token for a new pair, replacing the held token.
    pub async fn refresh(&self) -> FitbitResult<Token> {
        let mut store = self.store.lock().await;
        self.refresh_locked(&mut store).await
    }

    /// Convert OAuth 1.0a credentials and return the serialized OAuth2 token.
    /// The held token is left untouched.
    pub async fn exchange_oauth1_credentials(
        &self,
        oauth1_token: &str,
        oauth1_secret: &str,
    ) -> FitbitResult<String> {
        self.oauth()
            .exchange_oauth1_credentials(oauth1_token, oauth1_secret)
            .await?
            .to_serialized()
    }

    /// Guard run before every API call; returns the access token to send.
    pub async fn ensure_valid_token(&self) -> FitbitResult<String> {
        let mut store = self.store.lock().await;
        self.acquire_if_missing(&mut store).await?;

        if store.is_expired()? {
            if !self.options.auto_refresh {
                return Err(FitbitError::TokenExpired);
            }
            self.refresh_locked(&mut store).await?;
        }

        Ok(store.access_token()?.to_owned())
    }

    async fn acquire_if_missing(&self, store: &mut TokenStore) -> FitbitResult<()> {
        if store.get().is_some() {
            return Ok(());
        }
        if !self.options.auto_request {
            return Err(FitbitError::TokenMissing);
        }

        match self.flow.run(&self.inbound, self.session.as_ref()).await? {
            AuthOutcome::Redirect(url) => Err(FitbitError::RedirectRequired(url)),
            AuthOutcome::Authorized(token) => {
                store.replace(token);
                Ok(())
            }
        }
    }

    async fn refresh_locked(&self, store: &mut TokenStore) -> FitbitResult<Token> {
        let current = store.require()?.clone();
        let refreshed = self.oauth().refresh_token(&current).await?;
        debug!(expires_at = %refreshed.expires_at, "received new access token");
        store.replace(refreshed.clone());
        Ok(refreshed)
    }
}
