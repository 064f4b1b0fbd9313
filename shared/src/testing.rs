//! Test fixtures: a deterministic RS256 issuer and a task service wired
//! to in-process stores. Used by unit tests and the integration suite;
//! nothing here runs in production paths.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::Serialize;

use taskbox_atoms::attachments::MemoryAttachmentStore;
use taskbox_atoms::tasks::MemoryTaskStore;

use crate::auth::{Jwk, JwkSet, StaticKeySetSource, TokenVerifier};
use crate::service::TaskService;

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    iat: i64,
    nbf: i64,
    exp: i64,
}

/// A generated RSA issuer identity: signs tokens and publishes the
/// matching JWK.
pub struct TestIdentity {
    kid: String,
    private_pem: String,
    jwk: Jwk,
}

impl TestIdentity {
    pub fn new() -> Self {
        Self::with_kid("test-key-1")
    }

    pub fn with_kid(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("rsa key generation");
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("pem encoding")
            .to_string();

        let jwk = Jwk {
            kid: Some(kid.to_string()),
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())),
        };

        Self {
            kid: kid.to_string(),
            private_pem,
            jwk,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn jwk_set(&self) -> JwkSet {
        JwkSet {
            keys: vec![self.jwk.clone()],
        }
    }

    /// Verifier trusting exactly this identity's key set.
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(Arc::new(StaticKeySetSource::new(self.jwk_set())))
    }

    /// Token valid for the next hour.
    pub fn token_for(&self, sub: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.signed_token(sub, now - 10, now + 3600, &self.kid)
    }

    /// Token that expired an hour ago (past any default leeway).
    pub fn expired_token_for(&self, sub: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.signed_token(sub, now - 7200, now - 3600, &self.kid)
    }

    /// Token that only becomes valid an hour from now (past any default
    /// leeway).
    pub fn not_yet_valid_token_for(&self, sub: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.signed_token(sub, now + 3600, now + 7200, &self.kid)
    }

    /// Token carrying an arbitrary kid in its header.
    pub fn token_with_kid(&self, sub: &str, kid: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.signed_token(sub, now - 10, now + 3600, kid)
    }

    fn signed_token(&self, sub: &str, iat: i64, exp: i64, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());

        let claims = TestClaims {
            sub,
            iat,
            nbf: iat,
            exp,
        };
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("encoding key");

        encode(&header, &claims, &key).expect("token encoding")
    }
}

impl Default for TestIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide identity so tests do not pay RSA key generation each
/// time.
pub fn shared_identity() -> &'static TestIdentity {
    static IDENTITY: OnceLock<TestIdentity> = OnceLock::new();
    IDENTITY.get_or_init(TestIdentity::new)
}

/// Formats a token as the Authorization header value the service expects.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Task service over in-process adapters, with handles kept open so
/// tests can inspect store and blob-call state directly.
pub struct TestContext {
    pub service: TaskService,
    pub store: Arc<MemoryTaskStore>,
    pub attachments: Arc<MemoryAttachmentStore>,
    pub identity: &'static TestIdentity,
}

pub fn test_context() -> TestContext {
    let identity = shared_identity();
    let store = Arc::new(MemoryTaskStore::new());
    let attachments = Arc::new(MemoryAttachmentStore::new("attachments"));
    let verifier = TokenVerifier::new(Arc::new(StaticKeySetSource::new(identity.jwk_set())));
    let service = TaskService::new(
        verifier,
        store.clone(),
        attachments.clone(),
        Duration::from_secs(300),
    );

    TestContext {
        service,
        store,
        attachments,
        identity,
    }
}
