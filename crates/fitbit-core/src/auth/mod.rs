mod browser;
mod flow;
mod manager;
mod manual;
pub(crate) mod oauth;
pub(crate) mod session_storage;
mod store;
mod token;

pub use browser::run_loopback_flow;
pub use flow::{AuthFlowController, AuthOutcome, CallbackParams};
pub use manager::{ClientOptions, TokenManager};
pub use manual::run_manual_flow;
pub use oauth::{OAuthClient, OAuthConfig, OAuthEndpoints, DEFAULT_SCOPES};
pub use session_storage::{MemorySessionStorage, SessionStorage, AUTH_STATE_KEY};
pub use store::TokenStore;
pub use token::Token;
