//! Token-table identity provider.

use async_trait::async_trait;
use dashmap::DashMap;
use liaison_core::identity::IdentityProvider;
use liaison_core::{CoreError, Result, UserId};
use uuid::Uuid;

/// Identity provider backed by an in-process token table.
///
/// Stands in for the external auth collaborator in the CLI and in tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    sessions: DashMap<String, UserId>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh opaque token for `user`.
    pub fn issue(&self, user: &UserId) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), user.clone());
        token
    }

    /// Binds a caller-chosen token to `user`.
    pub fn insert(&self, token: impl Into<String>, user: UserId) {
        self.sessions.insert(token.into(), user);
    }

    /// Invalidates a token; returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self, session_token: &str) -> Result<UserId> {
        self.sessions
            .get(session_token)
            .map(|user| user.value().clone())
            .ok_or(CoreError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_and_revoke() {
        let provider = StaticIdentityProvider::new();
        let alice = UserId::from("alice");

        let token = provider.issue(&alice);
        assert_eq!(provider.current_user(&token).await.unwrap(), alice);

        assert!(provider.revoke(&token));
        assert_eq!(
            provider.current_user(&token).await.unwrap_err(),
            CoreError::Unauthenticated
        );
    }
}
