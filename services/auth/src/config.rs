use campus_core::config::Config;
use serde::Deserialize;

/// Auth service configuration, loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub database_url: String,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Base64-encoded 32-byte AES key protecting TOTP secrets at rest.
    pub totp_cipher_key: String,
    /// Issuer label shown in authenticator apps.
    #[serde(default = "default_token_issuer")]
    pub token_issuer: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
}

impl Config for AuthConfig {}

fn default_token_issuer() -> String {
    "Campus".to_owned()
}

fn default_access_ttl_secs() -> i64 {
    900
}

fn default_refresh_ttl_secs() -> i64 {
    604_800
}
