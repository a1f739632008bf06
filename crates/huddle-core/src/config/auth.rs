//! Token verification configuration.

use serde::{Deserialize, Serialize};

/// Settings for validating access tokens presented at connection time.
///
/// Token *issuance* belongs to the account service; this subsystem only
/// verifies what it is handed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the token issuer.
    pub jwt_secret: String,
    /// Clock-skew leeway in seconds when validating expiry.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_leeway() -> u64 {
    5
}
