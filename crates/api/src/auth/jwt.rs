//! Signed session tokens.
//!
//! A token is an HS256 JWT carrying the user's id, name, role and permission
//! flags as of login. Capability checks read them from the token alone, so a
//! permission change made by an admin takes effect at the user's next login.
//! There is no refresh flow.

use ctrack_core::capability::{CapabilitySet, PermissionFlags};
use ctrack_core::roles::Role;
use ctrack_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    pub username: String,
    pub role: Role,
    /// Stored flags, not yet widened for admins.
    pub permissions: PermissionFlags,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Who a token is issued for.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: DbId,
    pub username: &'a str,
    pub role: Role,
    pub permissions: CapabilitySet,
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Signing secret and token lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

/// One working day.
const DEFAULT_EXPIRY_MINS: i64 = 480;

impl JwtConfig {
    /// Read `JWT_SECRET` (required, non-empty) and `JWT_EXPIRY_MINS`
    /// (default 480).
    ///
    /// # Panics
    ///
    /// On a missing or empty secret, or a non-numeric or non-positive expiry.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins = match std::env::var("JWT_EXPIRY_MINS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .expect("JWT_EXPIRY_MINS must be a whole number of minutes"),
            Err(_) => DEFAULT_EXPIRY_MINS,
        };
        assert!(
            access_token_expiry_mins > 0,
            "JWT_EXPIRY_MINS must be positive"
        );

        Self {
            secret,
            access_token_expiry_mins,
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    /// Sign a token for `subject`, valid from now.
    pub fn issue(&self, subject: &TokenSubject<'_>) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue_at(subject, chrono::Utc::now().timestamp())
    }

    fn issue_at(
        &self,
        subject: &TokenSubject<'_>,
        issued_at: i64,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let expires_in = self.expires_in_secs();
        let claims = Claims {
            sub: subject.user_id,
            username: subject.username.to_string(),
            role: subject.role,
            permissions: subject.permissions.into(),
            exp: issued_at + expires_in,
            iat: issued_at,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(IssuedToken { token, expires_in })
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
    }
}
