use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::contract::{CmsApi, SessionToken};
use super::CmsError;

/// Session tokens keyed by account.
///
/// At most one token is kept per account and entries never expire. The lock
/// is not held while authenticating, so two concurrent misses on the same
/// account may both log in; the later write wins.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<String, SessionToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &str) -> Option<SessionToken> {
        self.tokens.lock().get(account).cloned()
    }

    pub fn insert(&self, account: impl Into<String>, token: SessionToken) {
        self.tokens.lock().insert(account.into(), token);
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }

    /// Cached token for `account`, authenticating through `api` on first use.
    pub async fn get_login_token<A>(
        &self,
        api: &A,
        account: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, CmsError>
    where
        A: CmsApi + ?Sized,
    {
        if let Some(token) = self.get(account) {
            debug!(account = account, "[CMS][AUTH] Token cache hit");
            return Ok(token);
        }

        let token = api.login(account, username, password).await?;
        self.insert(account, token.clone());
        info!(account = account, "[CMS][AUTH] Authenticated and cached token");
        Ok(token)
    }
}
