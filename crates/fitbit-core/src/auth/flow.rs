use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use tracing::{debug, warn};
use url::Url;

use super::session_storage::AUTH_STATE_KEY;
use super::{OAuthClient, SessionStorage, Token};
use crate::error::{FitbitError, FitbitResult};

const STATE_LEN: usize = 32;

/// Query parameters Fitbit appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "code" => params.code = Some(value.into()),
                "state" => params.state = Some(value.into()),
                "error" => params.error = Some(value.into()),
                _ => {}
            }
        }
        params
    }

    /// Parse a raw query string such as `code=abc&state=xyz`.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs().into_owned())
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.is_empty())
    }

    fn state(&self) -> Option<&str> {
        self.state.as_deref().filter(|state| !state.is_empty())
    }
}

/// Result of one step of the authorization-code flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Send the user's browser to this URL, then call the flow again from the redirect.
    Redirect(Url),
    /// The code was exchanged; the token is ready for use.
    Authorized(Token),
}

/// Drives the two-call authorization-code exchange.
///
/// The first call (no `code` in the inbound request) stores a fresh state in
/// the session and asks for a redirect. The second call checks the echoed
/// `state` against the stored one and exchanges the code. The stored state is
/// removed on both outcomes of the second call.
#[derive(Debug, Clone)]
pub struct AuthFlowController {
    oauth: OAuthClient,
    prompt: Option<String>,
}

impl AuthFlowController {
    pub fn new(oauth: OAuthClient) -> Self {
        Self {
            oauth,
            prompt: None,
        }
    }

    /// Ask Fitbit to show a specific prompt (`login`, `consent`, ...).
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    pub async fn run(
        &self,
        params: &CallbackParams,
        session: &dyn SessionStorage,
    ) -> FitbitResult<AuthOutcome> {
        if let Some(reason) = &params.error {
            session.delete(AUTH_STATE_KEY)?;
            warn!(%reason, "authorization denied by user");
            return Err(FitbitError::AccessDenied(reason.clone()));
        }

        if params.code().is_none() {
            return self.begin(session).map(AuthOutcome::Redirect);
        }

        self.complete(params, session).await.map(AuthOutcome::Authorized)
    }

    /// Issue a new state, replacing any stored one, and build the authorization URL.
    pub fn begin(&self, session: &dyn SessionStorage) -> FitbitResult<Url> {
        let state = generate_state();
        session.set(AUTH_STATE_KEY, state.clone())?;
        debug!("issued new authorization state");
        Ok(self.oauth.authorization_url(&state, self.prompt.as_deref()))
    }

    /// Verify the echoed state and exchange the code.
    pub async fn complete(
        &self,
        params: &CallbackParams,
        session: &dyn SessionStorage,
    ) -> FitbitResult<Token> {
        let expected = session.get(AUTH_STATE_KEY)?;
        session.delete(AUTH_STATE_KEY)?;

        let matches = match (params.state(), expected.as_deref()) {
            (Some(returned), Some(expected)) => returned == expected,
            _ => false,
        };
        if !matches {
            warn!("authorization state mismatch, rejecting callback");
            return Err(FitbitError::AuthStateMismatch);
        }

        let code = params.code().ok_or_else(|| {
            FitbitError::InvalidAuthorizationResponse("missing code parameter".into())
        })?;
        self.oauth.exchange_code(code).await
    }
}

fn generate_state() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
