//! Authentication collaborator interface.

use crate::error::Result;
use crate::ids::UserId;
use async_trait::async_trait;

/// Maps a session token issued by the auth collaborator to a user.
///
/// Session issuance itself lives outside the core; this is the only
/// question the core ever asks it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the user behind `session_token`.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` if the token is unknown or expired.
    async fn current_user(&self, session_token: &str) -> Result<UserId>;
}
