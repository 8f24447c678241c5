use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FitbitError, FitbitResult};

/// OAuth2 token pair issued by Fitbit, with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            user_id: None,
            scope: vec![],
        }
    }

    /// Parse a token previously produced by [`Token::to_serialized`].
    pub fn from_serialized(raw: &str) -> FitbitResult<Self> {
        let token: Token = serde_json::from_str(raw)?;
        if token.access_token.is_empty() {
            return Err(FitbitError::InvalidToken("empty access token".into()));
        }
        Ok(token)
    }

    /// Opaque string form suitable for storing outside the process.
    pub fn to_serialized(&self) -> FitbitResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn will_expire_within(&self, window: Duration) -> bool {
        Utc::now() + window >= self.expires_at
    }
}
