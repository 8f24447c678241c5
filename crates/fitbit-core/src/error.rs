use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub type FitbitResult<T> = Result<T, FitbitError>;

/// Errors surfaced by the token lifecycle and the Fitbit API dispatcher.
#[derive(Debug, Error)]
pub enum FitbitError {
    #[error("Fitbit OAuth token missing")]
    TokenMissing,
    #[error("Fitbit OAuth token expired")]
    TokenExpired,
    #[error("authorization state mismatch")]
    AuthStateMismatch,
    #[error("authorization required: redirect the user to {0}")]
    RedirectRequired(Url),
    #[error("Fitbit {status} (success: {success}): {payload}")]
    Api {
        status: StatusCode,
        success: bool,
        payload: ApiErrorPayload,
    },
    #[error("token endpoint error {status}: {payload}")]
    TokenEndpoint {
        status: StatusCode,
        payload: ApiErrorPayload,
    },
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authorization request denied ({0})")]
    AccessDenied(String),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authorization listener terminated before receiving redirect")]
    ListenerClosed,
    #[error("failed to launch system browser: {0}")]
    BrowserLaunch(String),
    #[error("invalid authorization response: {0}")]
    InvalidAuthorizationResponse(String),
}

/// Discriminant of [`FitbitError`], for callers that switch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TokenMissing,
    TokenExpired,
    AuthStateMismatch,
    RedirectRequired,
    Api,
    TokenEndpoint,
    Transport,
    AccessDenied,
    InvalidToken,
    Serialization,
    InvalidUrl,
    Io,
    Listener,
    Browser,
    InvalidAuthorizationResponse,
}

impl FitbitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FitbitError::TokenMissing => ErrorKind::TokenMissing,
            FitbitError::TokenExpired => ErrorKind::TokenExpired,
            FitbitError::AuthStateMismatch => ErrorKind::AuthStateMismatch,
            FitbitError::RedirectRequired(_) => ErrorKind::RedirectRequired,
            FitbitError::Api { .. } => ErrorKind::Api,
            FitbitError::TokenEndpoint { .. } => ErrorKind::TokenEndpoint,
            FitbitError::Transport(_) => ErrorKind::Transport,
            FitbitError::AccessDenied(_) => ErrorKind::AccessDenied,
            FitbitError::InvalidToken(_) => ErrorKind::InvalidToken,
            FitbitError::Serde(_) => ErrorKind::Serialization,
            FitbitError::Url(_) => ErrorKind::InvalidUrl,
            FitbitError::Io(_) => ErrorKind::Io,
            FitbitError::ListenerClosed => ErrorKind::Listener,
            FitbitError::BrowserLaunch(_) => ErrorKind::Browser,
            FitbitError::InvalidAuthorizationResponse(_) => ErrorKind::InvalidAuthorizationResponse,
        }
    }

    /// HTTP status attached to API and token endpoint failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FitbitError::Api { status, .. } | FitbitError::TokenEndpoint { status, .. } => {
                Some(*status)
            }
            FitbitError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// One entry of Fitbit's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Body of a failed response, parsed as far as its shape allows.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorPayload {
    Structured(Vec<ApiErrorDetail>),
    Json(Value),
    Raw(String),
}

impl ApiErrorPayload {
    /// Parse an error body, returning the `success` flag it carries (false when absent).
    pub fn from_body(body: &str) -> (bool, Self) {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return (false, ApiErrorPayload::Raw(body.to_owned())),
        };

        let success = value
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let structured = value
            .get("errors")
            .cloned()
            .and_then(|errors| serde_json::from_value::<Vec<ApiErrorDetail>>(errors).ok());

        match structured {
            Some(errors) => (success, ApiErrorPayload::Structured(errors)),
            None => (success, ApiErrorPayload::Json(value)),
        }
    }

    pub fn errors(&self) -> &[ApiErrorDetail] {
        match self {
            ApiErrorPayload::Structured(errors) => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for ApiErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorPayload::Structured(errors) => {
                let joined = errors
                    .iter()
                    .map(|err| match &err.field_name {
                        Some(field) => format!("{} ({field}): {}", err.error_type, err.message),
                        None => format!("{}: {}", err.error_type, err.message),
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{joined}")
            }
            ApiErrorPayload::Json(value) => write!(f, "{value}"),
            ApiErrorPayload::Raw(body) => write!(f, "{body}"),
        }
    }
}
