use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::FormParams;
use crate::auth::oauth::USER_AGENT;
use crate::error::{ApiErrorPayload, FitbitError, FitbitResult};

pub const DEFAULT_API_BASE: &str = "https://api.fitbit.com/1/";

/// A single Fitbit API call, before authentication is attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: FormParams,
    form: FormParams,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: FormParams::new(),
            form: FormParams::new(),
            headers: vec![],
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: FormParams) -> Self {
        self.query = query;
        self
    }

    pub fn form(mut self, form: FormParams) -> Self {
        self.form = form;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Sends authenticated requests to the Fitbit REST API and decodes JSON replies.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    http: Client,
    base_url: Url,
}

impl RequestDispatcher {
    pub fn new() -> FitbitResult<Self> {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Build a dispatcher against a custom API root (useful for testing).
    pub fn with_base_url(base_url: &str) -> FitbitResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resource path plus `.json`, resolved against the API root.
    pub fn url_for(&self, path: &str, query: &FormParams) -> FitbitResult<Url> {
        let relative = format!("{}.json", path.trim_start_matches('/'));
        let mut url = self.base_url.join(&relative)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    pub async fn send(&self, request: &ApiRequest, access_token: &str) -> FitbitResult<Value> {
        let url = self.url_for(&request.path, &request.query)?;
        debug!(method = %request.method, %url, "dispatching Fitbit API request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(access_token);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.method != Method::GET {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() >= 400 {
            let (success, payload) = ApiErrorPayload::from_body(&body);
            warn!(%status, path = %request.path, "Fitbit API request failed");
            return Err(FitbitError::Api {
                status,
                success,
                payload,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::StatusCode;

    #[test]
    fn url_appends_json_suffix_and_query() {
        let dispatcher = RequestDispatcher::new().unwrap();
        let query = FormParams::new().with("query", "banana bread");
        let url = dispatcher.url_for("foods/search", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.fitbit.com/1/foods/search.json?query=banana+bread"
        );
        let plain = dispatcher
            .url_for("user/-/profile", &FormParams::new())
            .unwrap();
        assert_eq!(plain.as_str(), "https://api.fitbit.com/1/user/-/profile.json");
    }

    #[test]
    fn escaped_segment_keeps_suffix_in_path() {
        let dispatcher = RequestDispatcher::new().unwrap();
        let url = dispatcher
            .url_for("user/-/apiSubscriptions/a%3Fb%23c", &FormParams::new())
            .unwrap();
        assert_eq!(url.path(), "/1/user/-/apiSubscriptions/a%3Fb%23c.json");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let dispatcher = RequestDispatcher::with_base_url("http://localhost:1234/1").unwrap();
        let url = dispatcher.url_for("activities", &FormParams::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/1/activities.json");
    }

    #[tokio::test]
    async fn get_sends_bearer_and_parses_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/1/user/-/profile.json")
                    .header("authorization", "Bearer token-1");
                then.status(200)
                    .json_body(serde_json::json!({"user": {"encodedId": "ABC"}}));
            })
            .await;

        let dispatcher = RequestDispatcher::with_base_url(&server.url("/1/")).unwrap();
        let value = dispatcher
            .send(&ApiRequest::get("user/-/profile"), "token-1")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(value["user"]["encodedId"], "ABC");
    }

    #[tokio::test]
    async fn post_sends_form_and_custom_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/user/-/apiSubscriptions/42.json")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("x-fitbit-subscriber-id", "sub-1")
                    .body_contains("amount=250");
                then.status(201).json_body(serde_json::json!({"ok": true}));
            })
            .await;

        let dispatcher = RequestDispatcher::with_base_url(&server.url("/1/")).unwrap();
        let request = ApiRequest::post("user/-/apiSubscriptions/42")
            .form(FormParams::new().with("amount", 250))
            .header("X-Fitbit-Subscriber-Id", "sub-1");
        let value = dispatcher.send(&request, "t").await.unwrap();
        mock.assert_async().await;
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/1/user/-/sleep/7.json");
                then.status(204);
            })
            .await;

        let dispatcher = RequestDispatcher::with_base_url(&server.url("/1/")).unwrap();
        let value = dispatcher
            .send(&ApiRequest::delete("user/-/sleep/7"), "t")
            .await
            .unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn conflict_surfaces_as_api_error_with_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/1/user/-/apiSubscriptions/1.json");
                then.status(409).json_body(serde_json::json!({
                    "errors": [{
                        "errorType": "request",
                        "fieldName": "subscriptionId",
                        "message": "Subscription already exists"
                    }],
                    "success": false
                }));
            })
            .await;

        let dispatcher = RequestDispatcher::with_base_url(&server.url("/1/")).unwrap();
        let err = dispatcher
            .send(&ApiRequest::post("user/-/apiSubscriptions/1"), "t")
            .await
            .unwrap_err();
        match err {
            FitbitError::Api {
                status,
                success,
                payload,
            } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert!(!success);
                assert_eq!(payload.errors()[0].field_name.as_deref(), Some("subscriptionId"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
