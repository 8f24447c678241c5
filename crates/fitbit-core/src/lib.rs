//! Core library for the Fitbit Web API: OAuth 2.0 token lifecycle, request dispatch and the endpoint catalog.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod services;

pub use auth::{ClientOptions, OAuthConfig, Token};
pub use client::FitbitClient;
pub use error::{ApiErrorDetail, ApiErrorPayload, ErrorKind, FitbitError, FitbitResult};
