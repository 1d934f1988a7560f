//! Startup identity resolution.

use std::time::Duration;

use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::client::RunClient;
use crate::types::UserIdentity;

/// Who is using the dashboard and against which backend.
///
/// Built once at startup and handed to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<UserIdentity>,
    pub endpoint: String,
}

impl Session {
    pub fn anonymous(endpoint: impl Into<String>) -> Self {
        Self {
            identity: None,
            endpoint: endpoint.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    pub fn display_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("anonymous")
    }
}

/// Resolve the current user: cached identity for this credential first, then
/// one bounded `get_current_user` call. Any failure degrades to anonymous.
pub async fn authenticate(
    client: &dyn RunClient,
    cache: &CacheStore,
    token_hash: &str,
    timeout: Duration,
) -> Session {
    let endpoint = client.endpoint();

    if let Some(identity) = cache.cached_identity(token_hash) {
        info!(user = %identity.username, "using cached identity");
        return Session {
            identity: Some(identity),
            endpoint,
        };
    }

    match tokio::time::timeout(timeout, client.get_current_user()).await {
        Ok(Ok(identity)) => {
            info!(user = %identity.username, "authenticated");
            cache.set_identity(identity.clone(), token_hash);
            Session {
                identity: Some(identity),
                endpoint,
            }
        }
        Ok(Err(e)) => {
            warn!(error = %e, "authentication failed, continuing anonymously");
            Session::anonymous(endpoint)
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "authentication timed out, continuing anonymously"
            );
            Session::anonymous(endpoint)
        }
    }
}
