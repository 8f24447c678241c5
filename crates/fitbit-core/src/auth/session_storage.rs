use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::FitbitResult;

/// Session key under which the in-flight authorization state is kept.
pub const AUTH_STATE_KEY: &str = "fitbit-oauth2-state";

/// Key-value storage scoped to one user's browser session.
///
/// Implementations must live on the server side; the authorization state
/// stored here is compared against the value echoed back by the browser.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> FitbitResult<Option<String>>;
    fn set(&self, key: &str, value: String) -> FitbitResult<()>;
    fn delete(&self, key: &str) -> FitbitResult<()>;
}

/// In-process session storage, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> FitbitResult<Option<String>> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> FitbitResult<()> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> FitbitResult<()> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(key);
        Ok(())
    }
}
