use actix_web::{dev::Payload, http::header::HeaderMap, Error, FromRequest, HttpMessage, HttpRequest};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::{err, ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

mod firebase;
mod middleware;

pub use firebase::FirebaseVerifier;
pub use middleware::{Access, AuthGate};

/// Identity claim attached to an authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID at the identity provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize, // Expiration timestamp
    pub iat: usize, // Issued at timestamp
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no signing key with id {0}")]
    UnknownKeyId(String),
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

impl AuthError {
    fn from_jwt(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e),
        }
    }
}

/// Turns a bearer credential into a verified identity claim.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// The caller's verified identity, available to handlers behind an
/// [`AuthGate`] that requires at least [`Access::User`].
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Extract the claims from the request extensions (set by the auth gate)
        match req.extensions().get::<Claims>() {
            Some(claims) => ok(AuthenticatedUser {
                user_id: claims.sub.clone(),
                email: claims.email.clone(),
            }),
            None => err(ApiError::Unauthorized.into()),
        }
    }
}

/// Reads `Authorization: Bearer <token>`. Returns `None` when the header is
/// absent or carries no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub fn create_token(
    user_id: &str,
    email: Option<&str>,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = (now + Duration::seconds(expiration_seconds as i64)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Invalid)
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(AuthError::from_jwt)
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct SecretVerifier {
    secret: String,
}

impl SecretVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, user_id: &str, email: Option<&str>, expiration_seconds: u64) -> Result<String, AuthError> {
        create_token(user_id, email, &self.secret, expiration_seconds)
    }
}

#[async_trait]
impl IdentityVerifier for SecretVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        validate_token(token, &self.secret)
    }
}
