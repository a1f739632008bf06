//! Connection-time token verification.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::UserId;

/// Identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub user_id: UserId,
    /// Username (cached for display in envelopes).
    pub username: String,
}

/// Verifies opaque access tokens presented when a connection is opened.
///
/// Implemented by the account service; a failed verification is
/// connection-fatal and must occur before any delivery state is created.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a token and resolves the user identity it carries.
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser>;
}
