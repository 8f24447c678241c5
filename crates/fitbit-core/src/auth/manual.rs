use std::future::Future;

use url::Url;

use super::session_storage::AUTH_STATE_KEY;
use super::{AuthFlowController, CallbackParams, MemorySessionStorage, SessionStorage, Token};
use crate::error::{FitbitError, FitbitResult};

/// Execute the copy/paste flow: the user authorizes in any browser and pastes
/// back either the full redirect URL or just the code.
pub async fn run_manual_flow<Notify, Input, Fut>(
    flow: &AuthFlowController,
    open_browser: bool,
    notify_authorization_url: Notify,
    mut read_input: Input,
) -> FitbitResult<Token>
where
    Notify: Fn(&Url) -> FitbitResult<()>,
    Input: FnMut() -> Fut,
    Fut: Future<Output = FitbitResult<String>>,
{
    let session = MemorySessionStorage::new();
    let auth_url = flow.begin(&session)?;

    notify_authorization_url(&auth_url)?;

    if open_browser {
        open::that(auth_url.as_str()).map_err(|err| FitbitError::BrowserLaunch(err.to_string()))?;
    }

    let raw = read_input().await?;
    let mut params = parse_manual_input(raw.trim())?;

    // A bare code was typed by the user on this machine; no state travels with it.
    if params.state.is_none() {
        params.state = session.get(AUTH_STATE_KEY)?;
    }

    flow.complete(&params, &session).await
}

fn parse_manual_input(input: &str) -> FitbitResult<CallbackParams> {
    if input.is_empty() {
        return Err(FitbitError::InvalidAuthorizationResponse(
            "empty input".into(),
        ));
    }

    if let Ok(url) = Url::parse(input) {
        let params = CallbackParams::from_url(&url);
        if let Some(err) = params.error {
            return Err(FitbitError::AccessDenied(err));
        }
        if params.code.is_none() {
            return Err(FitbitError::InvalidAuthorizationResponse(
                "redirect URL has no code parameter".into(),
            ));
        }
        return Ok(params);
    }

    Ok(CallbackParams {
        code: Some(input.to_owned()),
        ..CallbackParams::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex};

    use crate::auth::{OAuthClient, OAuthConfig, OAuthEndpoints};

    fn test_flow(token_url: &str) -> AuthFlowController {
        let config = OAuthConfig::new(
            "client",
            "secret",
            Url::parse("https://example.com/callback").unwrap(),
        );
        let endpoints = OAuthEndpoints {
            authorization_url: Url::parse("https://www.fitbit.com/oauth2/authorize").unwrap(),
            token_url: Url::parse(token_url).unwrap(),
        };
        AuthFlowController::new(OAuthClient::with_endpoints(config, endpoints).unwrap())
    }

    async fn token_server() -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "abc",
                    "refresh_token": "ref",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }));
            })
            .await;
        server
    }

    #[tokio::test]
    async fn manual_flow_with_full_redirect() {
        let server = token_server().await;
        let flow = test_flow(&server.url("/token"));
        let state_holder = Arc::new(Mutex::new(String::new()));

        let notify = {
            let state_holder = state_holder.clone();
            move |url: &Url| {
                let state = url
                    .query_pairs()
                    .find(|(k, _)| k == "state")
                    .map(|(_, v)| v.into_owned())
                    .expect("state present");
                *state_holder.lock().unwrap() = state;
                Ok(())
            }
        };

        let read_input = {
            let state_holder = state_holder.clone();
            move || {
                let state = state_holder.lock().unwrap().clone();
                async move {
                    Ok(format!(
                        "https://example.com/callback?code=manual-code&state={state}"
                    ))
                }
            }
        };

        let token = run_manual_flow(&flow, false, notify, read_input)
            .await
            .expect("manual flow succeeded");
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.refresh_token, "ref");
    }

    #[tokio::test]
    async fn manual_flow_with_code_only() {
        let server = token_server().await;
        let flow = test_flow(&server.url("/token"));
        let token = run_manual_flow(
            &flow,
            false,
            |_| Ok(()),
            || async { Ok("raw-code".to_string()) },
        )
        .await
        .expect("manual flow succeeded");
        assert_eq!(token.access_token, "abc");
    }

    #[tokio::test]
    async fn manual_flow_state_mismatch() {
        let server = token_server().await;
        let flow = test_flow(&server.url("/token"));
        let err = run_manual_flow(
            &flow,
            false,
            |_| Ok(()),
            || async { Ok("https://example.com/callback?code=manual&state=bad".to_string()) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FitbitError::AuthStateMismatch));
    }

    #[test]
    fn parse_input_access_denied() {
        let err =
            parse_manual_input("https://example.com/callback?error=access_denied").unwrap_err();
        assert!(matches!(err, FitbitError::AccessDenied(_)));
    }

    #[test]
    fn parse_input_rejects_empty() {
        assert!(matches!(
            parse_manual_input("").unwrap_err(),
            FitbitError::InvalidAuthorizationResponse(_)
        ));
    }
}
