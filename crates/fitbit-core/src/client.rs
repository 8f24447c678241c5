use std::sync::Arc;

use serde_json::Value;

use crate::api::{ApiRequest, FormParams, RequestDispatcher};
use crate::auth::{
    AuthFlowController, AuthOutcome, CallbackParams, ClientOptions, OAuthClient, OAuthConfig,
    SessionStorage, Token, TokenManager,
};
use crate::error::FitbitResult;
use crate::services::{
    AccountService, ActivityService, BodyService, FoodService, FriendService, ProfileService,
    SleepService, SubscriptionService, TimeSeriesService,
};

/// Fitbit Web API client: one token, one session, one method per endpoint.
pub struct FitbitClient {
    tokens: TokenManager,
    dispatcher: RequestDispatcher,
}

impl FitbitClient {
    pub fn new(config: OAuthConfig) -> FitbitResult<Self> {
        Self::with_options(config, ClientOptions::default())
    }

    pub fn with_options(config: OAuthConfig, options: ClientOptions) -> FitbitResult<Self> {
        let oauth = OAuthClient::new(config)?;
        Ok(Self::from_parts(
            TokenManager::new(oauth, options),
            RequestDispatcher::new()?,
        ))
    }

    /// Assemble a client from preconfigured parts (custom endpoints, test servers).
    pub fn from_parts(tokens: TokenManager, dispatcher: RequestDispatcher) -> Self {
        Self { tokens, dispatcher }
    }

    pub fn with_session_storage(mut self, session: Arc<dyn SessionStorage>) -> Self {
        self.tokens = self.tokens.with_session_storage(session);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        let flow = self.tokens.flow().clone().with_prompt(prompt);
        self.tokens = self.tokens.with_flow(flow);
        self
    }

    /// Record the query parameters of the inbound web request so an automatic
    /// authorization can complete on the redirect back from Fitbit.
    pub fn set_callback_params(&mut self, params: CallbackParams) {
        self.tokens.set_callback_params(params);
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn auth_flow(&self) -> &AuthFlowController {
        self.tokens.flow()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub async fn authorize(&self, params: &CallbackParams) -> FitbitResult<AuthOutcome> {
        self.tokens.authorize(params).await
    }

    /// Serialized token for external persistence.
    pub async fn token(&self) -> FitbitResult<String> {
        self.tokens.token().await
    }

    pub async fn set_token(&self, serialized: &str) -> FitbitResult<()> {
        self.tokens.set_token(serialized).await
    }

    pub async fn replace_token(&self, token: Token) {
        self.tokens.replace_token(token).await
    }

    pub async fn refresh_token(&self) -> FitbitResult<Token> {
        self.tokens.refresh().await
    }

    pub async fn has_token_expired(&self) -> FitbitResult<bool> {
        self.tokens.has_token_expired().await
    }

    /// Send any request through the token guard; the typed services build on this.
    pub async fn execute(&self, request: ApiRequest) -> FitbitResult<Value> {
        let access_token = self.tokens.ensure_valid_token().await?;
        self.dispatcher.send(&request, &access_token).await
    }

    pub(crate) async fn get(&self, path: impl Into<String>) -> FitbitResult<Value> {
        self.execute(ApiRequest::get(path)).await
    }

    pub(crate) async fn get_with_query(
        &self,
        path: impl Into<String>,
        query: FormParams,
    ) -> FitbitResult<Value> {
        self.execute(ApiRequest::get(path).query(query)).await
    }

    pub(crate) async fn post(
        &self,
        path: impl Into<String>,
        form: FormParams,
    ) -> FitbitResult<Value> {
        self.execute(ApiRequest::post(path).form(form)).await
    }

    pub(crate) async fn delete(&self, path: impl Into<String>) -> FitbitResult<Value> {
        self.execute(ApiRequest::delete(path)).await
    }

    pub fn profile(&self) -> ProfileService<'_> {
        ProfileService::new(self)
    }

    pub fn activities(&self) -> ActivityService<'_> {
        ActivityService::new(self)
    }

    pub fn foods(&self) -> FoodService<'_> {
        FoodService::new(self)
    }

    pub fn sleep(&self) -> SleepService<'_> {
        SleepService::new(self)
    }

    pub fn body(&self) -> BodyService<'_> {
        BodyService::new(self)
    }

    pub fn time_series(&self) -> TimeSeriesService<'_> {
        TimeSeriesService::new(self)
    }

    pub fn friends(&self) -> FriendService<'_> {
        FriendService::new(self)
    }

    pub fn subscriptions(&self) -> SubscriptionService<'_> {
        SubscriptionService::new(self)
    }

    pub fn account(&self) -> AccountService<'_> {
        AccountService::new(self)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::OAuthEndpoints;
    use chrono::{Duration, Utc};
    use httpmock::MockServer;
    use url::Url;

    /// Client wired to a mock server for both the token endpoint and the API.
    pub(crate) fn client_for(server: &MockServer, options: ClientOptions) -> FitbitClient {
        let config = OAuthConfig::new(
            "client",
            "secret",
            Url::parse("http://localhost/callback").unwrap(),
        );
        let endpoints = OAuthEndpoints {
            authorization_url: Url::parse("http://localhost/authorize").unwrap(),
            token_url: Url::parse(&server.url("/oauth2/token")).unwrap(),
        };
        let oauth = OAuthClient::with_endpoints(config, endpoints).unwrap();
        let dispatcher = RequestDispatcher::with_base_url(&server.url("/1/")).unwrap();
        FitbitClient::from_parts(TokenManager::new(oauth, options), dispatcher)
    }

    /// Client already holding a valid token `"access"`.
    pub(crate) async fn authorized_client(server: &MockServer) -> FitbitClient {
        let client = client_for(server, ClientOptions::default());
        client
            .replace_token(Token::new("access", "refresh", Utc::now() + Duration::hours(8)))
            .await;
        client
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::client_for;
    use super::*;
    use crate::error::FitbitError;
    use chrono::{Duration, Utc};
    use httpmock::prelude::*;

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let api = server
            .mock_async(|when, then| {
                when.path_contains("/1/");
                then.status(200).json_body(serde_json::json!({}));
            })
            .await;

        let client = client_for(
            &server,
            ClientOptions {
                auto_request: false,
                auto_refresh: true,
            },
        );
        let err = client.profile().get().await.unwrap_err();
        assert!(matches!(err, FitbitError::TokenMissing));
        api.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn expired_token_refreshes_once_then_calls_api() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth2/token")
                    .body_contains("refresh_token=stale-refresh");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "fresh-access",
                    "refresh_token": "fresh-refresh",
                    "token_type": "Bearer",
                    "expires_in": 28800
                }));
            })
            .await;
        let profile = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/1/user/-/profile.json")
                    .header("authorization", "Bearer fresh-access");
                then.status(200)
                    .json_body(serde_json::json!({"user": {"encodedId": "X", "displayName": "X"}}));
            })
            .await;

        let client = client_for(&server, ClientOptions::default());
        client
            .replace_token(Token::new(
                "stale-access",
                "stale-refresh",
                Utc::now() - Duration::minutes(1),
            ))
            .await;

        client.profile().get().await.unwrap();
        client.profile().get().await.unwrap();

        refresh.assert_hits_async(1).await;
        profile.assert_hits_async(2).await;
        let stored = Token::from_serialized(&client.token().await.unwrap()).unwrap();
        assert_eq!(stored.access_token, "fresh-access");
        assert_eq!(stored.refresh_token, "fresh-refresh");
    }

    #[tokio::test]
    async fn concurrent_calls_share_a_single_refresh() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "fresh-access",
                    "refresh_token": "fresh-refresh",
                    "token_type": "Bearer",
                    "expires_in": 28800
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1/user/-/devices.json");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let client = client_for(&server, ClientOptions::default());
        client
            .replace_token(Token::new("old", "old-refresh", Utc::now() - Duration::minutes(1)))
            .await;

        let first = client.account();
        let second = client.account();
        let (a, b) = tokio::join!(first.devices(), second.devices());
        a.unwrap();
        b.unwrap();
        refresh.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn set_token_accepts_serialized_form() {
        let server = MockServer::start_async().await;
        let client = client_for(&server, ClientOptions::default());
        let token = Token::new("a", "r", Utc::now() + Duration::hours(1));
        client
            .set_token(&token.to_serialized().unwrap())
            .await
            .unwrap();
        assert!(!client.has_token_expired().await.unwrap());
        assert_eq!(
            Token::from_serialized(&client.token().await.unwrap()).unwrap(),
            token
        );
    }
}
