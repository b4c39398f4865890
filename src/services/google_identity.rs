// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sign-In ID token verification.
//!
//! The mobile client signs in with Google and hands the resulting ID token
//! to the backend. We only validate it; the sign-in protocol itself is
//! Google's.

use crate::config::Config;
use crate::models::User;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

/// Google's published signing keys for ID tokens.
const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const FALLBACK_KEY_TTL: Duration = Duration::from_secs(300);
const LEEWAY_SECS: u64 = 60;

/// ID token verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The token is invalid or its claims do not match expectations.
    #[error("ID token rejected: {0}")]
    Rejected(String),
    /// Google's key endpoint could not be reached.
    #[error("identity provider unavailable: {0}")]
    Transient(String),
}

fn rejected(reason: impl Into<String>) -> IdentityError {
    IdentityError::Rejected(reason.into())
}

/// Signing keys by `kid`, valid until `fresh_until`.
struct KeySet {
    keys: HashMap<String, Arc<DecodingKey>>,
    fresh_until: Instant,
}

impl KeySet {
    fn is_fresh(&self) -> bool {
        self.fresh_until > Instant::now()
    }

    fn lookup(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| rejected(format!("JWT kid not in Google certs: {kid}")))
    }
}

/// Answer from the cache while it is fresh, whether or not `kid` is in it.
async fn cached_lookup(
    cached: &RwLock<Option<KeySet>>,
    kid: &str,
) -> Option<Result<Arc<DecodingKey>, IdentityError>> {
    cached
        .read()
        .await
        .as_ref()
        .filter(|set| set.is_fresh())
        .map(|set| set.lookup(kid))
}

enum KeySource {
    /// Fetch and cache Google's JWKS.
    Google {
        http: reqwest::Client,
        certs_url: String,
        cached: RwLock<Option<KeySet>>,
        refreshing: Mutex<()>,
    },
    /// One fixed key, for tests and local runs.
    Static {
        kid: String,
        algorithm: Algorithm,
        key: Arc<DecodingKey>,
    },
}

/// Verifier for Google-issued ID tokens.
pub struct GoogleIdentityVerifier {
    client_id: String,
    source: KeySource,
}

impl GoogleIdentityVerifier {
    /// Verifier backed by Google's published keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("failed building Google certs HTTP client")?;

        tracing::info!(
            client_id = %config.google_client_id,
            "Initialized Google ID token verifier"
        );

        Ok(Self {
            client_id: config.google_client_id.clone(),
            source: KeySource::Google {
                http,
                certs_url: GOOGLE_CERTS_URL.to_string(),
                cached: RwLock::new(None),
                refreshing: Mutex::new(()),
            },
        })
    }

    /// Verifier that accepts tokens signed with one fixed key.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        algorithm: Algorithm,
        key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static ID token kid must not be empty");
        }

        Ok(Self {
            client_id: config.google_client_id.clone(),
            source: KeySource::Static {
                kid,
                algorithm,
                key: Arc::new(key),
            },
        })
    }

    fn algorithm(&self) -> Algorithm {
        match &self.source {
            KeySource::Google { .. } => Algorithm::RS256,
            KeySource::Static { algorithm, .. } => *algorithm,
        }
    }

    /// Validate a Google ID token and return the signed-in user.
    ///
    /// The email is only surfaced when Google marks it verified.
    pub async fn verify_id_token(&self, token: &str) -> Result<User, IdentityError> {
        if token.is_empty() {
            return Err(rejected("ID token is empty"));
        }

        let header =
            decode_header(token).map_err(|e| rejected(format!("invalid JWT header: {e}")))?;

        let algorithm = self.algorithm();
        if header.alg != algorithm {
            return Err(rejected(format!("unexpected JWT alg: {:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| rejected("missing JWT kid"))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;

        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| rejected(format!("JWT validation failed: {e}")))?
            .claims;

        match claims.iat {
            None => return Err(rejected("missing iat claim")),
            Some(iat) if iat > unix_now() + LEEWAY_SECS => {
                return Err(rejected("iat claim is in the future"));
            }
            Some(_) => {}
        }

        let email = match (claims.email, claims.email_verified) {
            (Some(email), Some(true)) => Some(email),
            (Some(_), _) => {
                tracing::warn!(subject = %claims.sub, "Ignoring unverified email claim");
                None
            }
            (None, _) => None,
        };

        tracing::info!(
            subject = %claims.sub,
            has_email = email.is_some(),
            "Google ID token verified"
        );

        Ok(User {
            uid: claims.sub,
            email,
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        let (http, certs_url, cached, refreshing) = match &self.source {
            KeySource::Static {
                kid: static_kid,
                key,
                ..
            } => {
                return if kid == static_kid {
                    Ok(key.clone())
                } else {
                    Err(rejected(format!("unknown JWT kid: {kid}")))
                };
            }
            KeySource::Google {
                http,
                certs_url,
                cached,
                refreshing,
            } => (http, certs_url, cached, refreshing),
        };

        // Unknown kids only trigger a fetch once the cached certs expire.
        if let Some(found) = cached_lookup(cached, kid).await {
            return found;
        }

        // One fetch at a time; whoever waited finds the refreshed set.
        let _guard = refreshing.lock().await;
        if let Some(found) = cached_lookup(cached, kid).await {
            return found;
        }

        let set = fetch_google_keys(http, certs_url).await?;
        let key = set.lookup(kid);
        *cached.write().await = Some(set);

        key
    }
}

async fn fetch_google_keys(http: &reqwest::Client, url: &str) -> Result<KeySet, IdentityError> {
    let transient = |what: &str, e: &dyn std::fmt::Display| {
        IdentityError::Transient(format!("{what}: {e}"))
    };

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| transient("certs request failed", &e))?;
    if !response.status().is_success() {
        return Err(transient("certs request returned", &response.status()));
    }

    let ttl = max_age(response.headers()).unwrap_or(FALLBACK_KEY_TTL);
    let jwks: Jwks = response
        .json()
        .await
        .map_err(|e| transient("invalid certs JSON", &e))?;

    let keys = signing_keys(jwks);
    if keys.is_empty() {
        return Err(IdentityError::Transient(
            "Google certs contained no usable RS256 keys".to_string(),
        ));
    }

    tracing::debug!(keys = keys.len(), ttl_secs = ttl.as_secs(), "Google certs refreshed");
    Ok(KeySet {
        keys,
        fresh_until: Instant::now() + ttl,
    })
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// RSA signature keys from a JWKS document, by `kid`.
fn signing_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    jwks.keys
        .into_iter()
        .filter(|jwk| jwk.kty == "RSA" && !jwk.kid.trim().is_empty())
        .filter(|jwk| jwk.alg.as_deref().map_or(true, |alg| alg == "RS256"))
        .filter(|jwk| jwk.key_use.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA key");
                None
            }
        })
        .collect()
}

/// `max-age` from a `Cache-Control` header.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim_matches('"').parse().ok())
        .map(Duration::from_secs)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use reqwest::header::HeaderValue;
    use serde_json::json;

    const KID: &str = "test-kid";
    const SECRET: &[u8] = b"static-id-token-secret";

    fn verifier() -> GoogleIdentityVerifier {
        GoogleIdentityVerifier::new_with_static_key(
            &Config::test_default(),
            KID,
            Algorithm::HS256,
            DecodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn token(claims: serde_json::Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn base_claims() -> serde_json::Value {
        let now = unix_now();
        json!({
            "iss": "https://accounts.google.com",
            "aud": Config::test_default().google_client_id,
            "sub": "1234567890",
            "iat": now,
            "exp": now + 3600,
            "email": "a@x.com",
            "email_verified": true,
        })
    }

    #[tokio::test]
    async fn valid_token_yields_user_with_email() {
        let user = verifier()
            .verify_id_token(&token(base_claims(), KID))
            .await
            .unwrap();
        assert_eq!(user.uid, "1234567890");
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn unverified_email_is_dropped() {
        let mut claims = base_claims();
        claims["email_verified"] = json!(false);

        let user = verifier()
            .verify_id_token(&token(claims, KID))
            .await
            .unwrap();
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let mut claims = base_claims();
        claims["aud"] = json!("someone-else.apps.googleusercontent.com");

        let err = verifier()
            .verify_id_token(&token(claims, KID))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let mut claims = base_claims();
        claims["iss"] = json!("https://evil.example.com");

        assert!(verifier()
            .verify_id_token(&token(claims, KID))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let err = verifier()
            .verify_id_token(&token(base_claims(), "other-kid"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }

    #[tokio::test]
    async fn future_iat_is_rejected() {
        let mut claims = base_claims();
        claims["iat"] = json!(unix_now() + 3600);

        assert!(verifier()
            .verify_id_token(&token(claims, KID))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let err = verifier().verify_id_token("").await.unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }

    fn cache_control(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn max_age_from_cache_control() {
        assert_eq!(
            max_age(&cache_control("public, max-age=19876, must-revalidate")),
            Some(Duration::from_secs(19876))
        );
        assert_eq!(
            max_age(&cache_control("max-age=\"120\"")),
            Some(Duration::from_secs(120))
        );
        assert_eq!(max_age(&cache_control("public, immutable")), None);
        assert_eq!(max_age(&cache_control("max-age=abc")), None);
        assert_eq!(max_age(&HeaderMap::new()), None);
    }

    #[test]
    fn signing_keys_skip_non_rsa_and_encryption_keys() {
        let jwks: Jwks = serde_json::from_value(json!({
            "keys": [
                { "kid": "ec", "kty": "EC", "n": "AQAB", "e": "AQAB" },
                { "kid": "enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB" },
                { "kid": "", "kty": "RSA", "n": "AQAB", "e": "AQAB" },
                { "kid": "ps", "kty": "RSA", "alg": "PS256", "n": "AQAB", "e": "AQAB" }
            ]
        }))
        .unwrap();

        assert!(signing_keys(jwks).is_empty());
    }

    /// Google-backed verifier whose certs endpoint refuses connections.
    fn google_verifier(fresh_for: Duration) -> GoogleIdentityVerifier {
        let keys = HashMap::from([(
            KID.to_string(),
            Arc::new(DecodingKey::from_secret(SECRET)),
        )]);
        let now = Instant::now();
        let fresh_until = now.checked_sub(Duration::from_secs(1)).unwrap_or(now) + fresh_for;

        GoogleIdentityVerifier {
            client_id: "test-client-id".to_string(),
            source: KeySource::Google {
                http: reqwest::Client::builder()
                    .timeout(Duration::from_secs(1))
                    .build()
                    .unwrap(),
                certs_url: "http://127.0.0.1:9/certs".to_string(),
                cached: RwLock::new(Some(KeySet { keys, fresh_until })),
                refreshing: Mutex::new(()),
            },
        }
    }

    #[tokio::test]
    async fn fresh_cache_answers_unknown_kid_without_fetching() {
        let verifier = google_verifier(Duration::from_secs(3600));

        assert!(verifier.key_for(KID).await.is_ok());
        for _ in 0..20 {
            let err = verifier.key_for("rotated-kid").await.err().unwrap();
            assert!(matches!(err, IdentityError::Rejected(_)));
        }
    }

    #[tokio::test]
    async fn stale_cache_refetches_certs() {
        let verifier = google_verifier(Duration::ZERO);

        let err = verifier.key_for(KID).await.err().unwrap();
        assert!(matches!(err, IdentityError::Transient(_)));
    }
}
