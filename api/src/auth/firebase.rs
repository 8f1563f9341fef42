//! Verification of Firebase ID tokens against Google's published signing keys.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{AuthError, Claims, IdentityVerifier};

const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Google rotates these keys every few hours and serves them with a max-age
/// of about six; refreshing hourly keeps well inside that.
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct FirebaseVerifier {
    project_id: String,
    client: Client,
    jwks_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            project_id,
            client,
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            cache: RwLock::new(None),
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(DecodingKey::from_jwk(jwk)?);
                    }
                }
            }
        }

        // Stale cache or a key we have not seen yet
        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()));

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        info!("Fetching Firebase signing keys");
        let keys: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Fetched {} signing keys", keys.keys.len());
        Ok(keys)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(AuthError::from_jwt)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.decoding_key(&kid).await?;

        decode::<Claims>(token, &key, &self.validation())
            .map(|data| data.claims)
            .map_err(AuthError::from_jwt)
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    #[tokio::test]
    async fn rejects_garbage_before_fetching_keys() {
        let verifier = FirebaseVerifier::new("food-share".into(), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            verifier.verify("not-a-token").await,
            Err(AuthError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn rejects_tokens_without_key_id() {
        let verifier = FirebaseVerifier::new("food-share".into(), Duration::from_secs(1)).unwrap();
        let token = encode(
            &Header::default(),
            &Claims { sub: "uid".into(), email: None, exp: usize::MAX / 2, iat: 0 },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::MissingKeyId)
        ));
    }

    #[test]
    fn validation_pins_project() {
        let verifier = FirebaseVerifier::new("food-share".into(), Duration::from_secs(1)).unwrap();
        let validation = verifier.validation();
        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        assert!(validation.aud.unwrap().contains("food-share"));
        assert!(validation
            .iss
            .unwrap()
            .contains("https://securetoken.google.com/food-share"));
    }
}
