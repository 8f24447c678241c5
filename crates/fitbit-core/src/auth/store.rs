use chrono::{DateTime, Utc};

use super::Token;
use crate::error::{FitbitError, FitbitResult};

/// Holds the token owned by one client instance.
///
/// Not synchronized; callers that share it wrap it in a lock.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: Option<Token>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self { token: Some(token) }
    }

    pub fn get(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn require(&self) -> FitbitResult<&Token> {
        self.token.as_ref().ok_or(FitbitError::TokenMissing)
    }

    /// Serialized form of the held token.
    pub fn get_serialized(&self) -> FitbitResult<String> {
        self.require()?.to_serialized()
    }

    /// Replace the held token with one parsed from its serialized form.
    pub fn set(&mut self, serialized: &str) -> FitbitResult<()> {
        self.token = Some(Token::from_serialized(serialized)?);
        Ok(())
    }

    pub fn replace(&mut self, token: Token) {
        self.token = Some(token);
    }

    pub fn is_expired(&self) -> FitbitResult<bool> {
        Ok(self.require()?.is_expired())
    }

    pub fn access_token(&self) -> FitbitResult<&str> {
        Ok(&self.require()?.access_token)
    }

    pub fn refresh_token(&self) -> FitbitResult<&str> {
        Ok(&self.require()?.refresh_token)
    }

    pub fn expires_at(&self) -> FitbitResult<DateTime<Utc>> {
        Ok(self.require()?.expires_at)
    }
}
