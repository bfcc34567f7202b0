//! Credentials
//!
//! Signs and verifies the bearer tokens carried by API requests.
//! Tokens are HS256 JWTs whose custom claims are a [`Profile`].

use std::sync::Arc;

use jwt_simple::prelude::{Claims, Duration, HS256Key, MACLike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scope granted to users of the API
pub const USER_SCOPE: &str = "user";

/// Scope granted to a running build, with the build id as username
pub const BUILD_SCOPE: &str = "build";

/// Identity asserted by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub scope: Vec<String>,
}

impl Profile {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to sign token: {0}")]
    Sign(String),
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Token generator bound to a signing key and scope.
///
/// Called with a subject (a build id for build tokens), returns a signed
/// token for `{username: subject, scope}`.
pub type TokenGen = Arc<dyn Fn(&str) -> Result<String, CredentialsError> + Send + Sync>;

/// Build a profile for `username` with the given scopes
pub fn generate_profile(username: &str, scope: &[&str]) -> Profile {
    Profile {
        username: username.to_string(),
        scope: scope.iter().map(|s| s.to_string()).collect(),
    }
}

/// Signing key plus token lifetime
pub struct Credentials {
    key: HS256Key,
    token_ttl: Duration,
}

impl Credentials {
    pub fn new(secret: &[u8], token_ttl_hours: u64) -> Self {
        Self {
            key: HS256Key::from_bytes(secret),
            token_ttl: Duration::from_hours(token_ttl_hours),
        }
    }

    /// Sign a token embedding `profile`
    pub fn generate_token(&self, profile: &Profile) -> Result<String, CredentialsError> {
        let claims = Claims::with_custom_claims(profile.clone(), self.token_ttl)
            .with_subject(&profile.username);

        self.key
            .authenticate(claims)
            .map_err(|e| CredentialsError::Sign(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded profile
    pub fn verify(&self, token: &str) -> Result<Profile, CredentialsError> {
        let claims = self
            .key
            .verify_token::<Profile>(token, None)
            .map_err(|e| CredentialsError::Invalid(e.to_string()))?;

        Ok(claims.custom)
    }

    /// Bind this key to `scope`, producing a generator that can be handed
    /// to the model layer.
    pub fn token_generator(self: &Arc<Self>, scope: &[&'static str]) -> TokenGen {
        let credentials = Arc::clone(self);
        let scope = scope.to_vec();

        Arc::new(move |subject: &str| {
            credentials.generate_token(&generate_profile(subject, &scope))
        })
    }
}
