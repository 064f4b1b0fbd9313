use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

/// Verification failures. Callers must treat every variant as the same
/// uniform access denial; the detail string is for internal logs only
/// and never reaches the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingOrMalformed,

    #[error("token verification failed")]
    InvalidToken(String),
}

/// Identity resolved from a verified bearer token. The subject claim is
/// the tenant id every record operation is scoped by.
#[derive(Debug, Clone)]
pub struct TenantClaim {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// One key from the issuer's JWKS document. Every field is optional so
/// a non-RSA key elsewhere in the document cannot fail the whole parse;
/// keys without RSA components simply never yield a verification key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    /// RSA modulus and exponent, present only on RSA keys.
    pub fn rsa_components(&self) -> Option<(&str, &str)> {
        match (self.n.as_deref(), self.e.as_deref()) {
            (Some(n), Some(e)) => Some((n, e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Where the issuer's current public keys come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the JWKS document over HTTP on every call.
///
/// No cross-call cache: issuer key rotation is picked up immediately, at
/// the cost of one extra round trip per verification. A rotation-safe
/// cache is a possible optimization once request volume warrants it.
pub struct HttpKeySetSource {
    jwks_url: String,
    http: reqwest::Client,
}

impl HttpKeySetSource {
    /// Default client with modest fetch timeouts; every request pays for
    /// this fetch, so a stalled issuer must not stall the caller.
    pub fn new(jwks_url: String) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            // The builder only fails when TLS setup fails, where the plain
            // constructor panics on the same condition
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(jwks_url, http)
    }

    /// Use a caller-tuned HTTP client (timeouts, proxies).
    pub fn with_client(jwks_url: String, http: reqwest::Client) -> Self {
        Self { jwks_url, http }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("key set fetch failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AuthError::InvalidToken(format!("key set fetch failed: {}", e)))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("key set parse failed: {}", e)))
    }
}

/// Fixed key set for tests and offline tooling.
pub struct StaticKeySetSource {
    keys: JwkSet,
}

impl StaticKeySetSource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySetSource for StaticKeySetSource {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        Ok(self.keys.clone())
    }
}

/// Verifies RS256 bearer tokens against the issuer's key set and
/// resolves the calling tenant.
pub struct TokenVerifier {
    keys: Arc<dyn KeySetSource>,
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeySetSource>) -> Self {
        Self { keys }
    }

    /// Full verification: header shape, key lookup, signature, and
    /// time-based claims. Rejection reasons are logged, never returned.
    pub async fn verify(&self, bearer_header: Option<&str>) -> Result<TenantClaim, AuthError> {
        let token = extract_bearer_token(bearer_header)?;

        match self.check_token(token).await {
            Ok(claim) => {
                tracing::debug!(user_id = %claim.user_id, "authorized request");
                Ok(claim)
            }
            Err(err) => {
                if let AuthError::InvalidToken(reason) = &err {
                    tracing::warn!(reason = %reason, "rejected bearer token");
                }
                Err(err)
            }
        }
    }

    async fn check_token(&self, token: &str) -> Result<TenantClaim, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("undecodable header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header carries no kid".to_string()))?;

        let keys = self.keys.fetch_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("no key for kid {}", kid)))?;
        let (n, e) = jwk
            .rsa_components()
            .ok_or_else(|| AuthError::InvalidToken(format!("key {} is not an RSA key", kid)))?;

        let decoding_key = DecodingKey::from_rsa_components(n, e)
            .map_err(|err| AuthError::InvalidToken(format!("unusable key: {}", err)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(format!("verification failed: {}", e)))?;

        Ok(TenantClaim {
            user_id: data.claims.sub,
        })
    }
}

/// Pulls the raw token out of a `Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingOrMalformed)?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::MissingOrMalformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingOrMalformed);
    }

    Ok(token)
}
