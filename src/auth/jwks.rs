//! JWKS-backed token validation for the primary issuer.
//!
//! # Responsibilities
//! - Fetch the issuer's signing key from its well-known JWKS endpoint
//! - Cache the key for a fixed TTL and refetch on demand
//! - Verify signature, expiry, issuer and audience; map claims
//!
//! # Design Decisions
//! - One key per issuer: the first key of the set is used
//! - The cached key is swapped atomically; readers never block
//! - Concurrent misses share a single fetch, and callers queued behind a
//!   failed fetch get its error instead of fetching again
//! - Zero leeway on expiry

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use base64::prelude::*;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::auth::context::UserContext;
use crate::auth::error::AuthError;
use crate::auth::validator::TokenValidator;

/// JWKS response from the auth service.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    #[serde(default)]
    keys: Vec<JwkKey>,
}

/// A single JWK. Only the members needed to build a verification key.
#[derive(Debug, Deserialize)]
struct JwkKey {
    kty: String,
    alg: Option<String>,
    crv: Option<String>,
    /// RSA modulus (base64url).
    n: Option<String>,
    /// RSA exponent (base64url).
    e: Option<String>,
    /// OKP public key (base64url).
    x: Option<String>,
}

/// Claims the gateway reads. Registered claims are checked by `jsonwebtoken`.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Option<Roles>,
    #[serde(default)]
    email_verified: Option<bool>,
}

/// `roles` as issued: a list, or a single role as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Roles {
    One(String),
    Many(Vec<String>),
}

impl From<Roles> for Vec<String> {
    fn from(roles: Roles) -> Self {
        match roles {
            Roles::One(role) => vec![role],
            Roles::Many(roles) => roles,
        }
    }
}

/// Outcome of the last failed fetch, shared with callers that queued
/// behind it.
struct FetchFailure {
    at: Instant,
    error: AuthError,
}

struct CachedKey {
    key: DecodingKey,
    algorithm: Algorithm,
    fetched_at: Instant,
}

/// Validator for tokens issued by the FaultMaven auth service.
pub struct JwksValidator {
    jwks_url: Url,
    issuer: String,
    audience: String,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    client: reqwest::Client,
    cached: ArcSwapOption<CachedKey>,
    refresh: Mutex<Option<FetchFailure>>,
}

impl JwksValidator {
    pub fn new(
        jwks_url: Url,
        issuer: &str,
        audience: &str,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            jwks_url,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            cache_ttl,
            fetch_timeout,
            client,
            cached: ArcSwapOption::empty(),
            refresh: Mutex::new(None),
        })
    }

    /// Current signing key, fetching it if the cache is empty or stale.
    async fn signing_key(&self) -> Result<Arc<CachedKey>, AuthError> {
        if let Some(cached) = self.fresh_key() {
            return Ok(cached);
        }

        let queued_at = Instant::now();
        let mut last_failure = self.refresh.lock().await;
        // Another task may have refreshed while we waited.
        if let Some(cached) = self.fresh_key() {
            return Ok(cached);
        }
        if let Some(failure) = last_failure.as_ref().filter(|f| f.at >= queued_at) {
            return Err(failure.error.clone());
        }

        match self.fetch_key().await {
            Ok(key) => {
                *last_failure = None;
                let cached = Arc::new(key);
                self.cached.store(Some(cached.clone()));
                Ok(cached)
            }
            Err(error) => {
                *last_failure = Some(FetchFailure {
                    at: Instant::now(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn fresh_key(&self) -> Option<Arc<CachedKey>> {
        self.cached
            .load_full()
            .filter(|cached| cached.fetched_at.elapsed() < self.cache_ttl)
    }

    async fn fetch_key(&self) -> Result<CachedKey, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(self.jwks_url.clone())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!(url = %self.jwks_url, error = %e, "JWKS fetch failed");
                AuthError::KeyFetch(e.to_string())
            })?;

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidKeySet(e.to_string()))?;

        let first = jwks
            .keys
            .first()
            .ok_or_else(|| AuthError::InvalidKeySet("no signing keys in key set".to_string()))?;
        let (key, algorithm) = parse_key(first)?;

        tracing::info!(url = %self.jwks_url, algorithm = ?algorithm, "Cached signing key");

        Ok(CachedKey {
            key,
            algorithm,
            fetched_at: Instant::now(),
        })
    }
}

/// Build a verification key from a JWK.
fn parse_key(jwk: &JwkKey) -> Result<(DecodingKey, Algorithm), AuthError> {
    match jwk.kty.as_str() {
        "RSA" => {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                return Err(AuthError::InvalidKeySet("RSA key missing n or e".to_string()));
            };
            let algorithm = match jwk.alg.as_deref() {
                Some(alg) => Algorithm::from_str(alg)
                    .map_err(|_| AuthError::InvalidKeySet(format!("unknown algorithm {alg}")))?,
                None => Algorithm::RS256,
            };
            let key = DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AuthError::InvalidKeySet(e.to_string()))?;
            Ok((key, algorithm))
        }
        "OKP" => {
            let crv = jwk.crv.as_deref().unwrap_or("");
            if crv != "Ed25519" {
                return Err(AuthError::InvalidKeySet(format!("unsupported OKP curve '{crv}'")));
            }
            let x = jwk
                .x
                .as_deref()
                .ok_or_else(|| AuthError::InvalidKeySet("OKP key missing x".to_string()))?;
            let public_key = BASE64_URL_SAFE_NO_PAD
                .decode(x)
                .map_err(|e| AuthError::InvalidKeySet(format!("invalid base64: {e}")))?;
            Ok((DecodingKey::from_ed_der(&public_key), Algorithm::EdDSA))
        }
        other => Err(AuthError::InvalidKeySet(format!("unsupported key type '{other}'"))),
    }
}

#[async_trait]
impl TokenValidator for JwksValidator {
    async fn validate(&self, token: &str) -> Result<UserContext, AuthError> {
        let signing = self.signing_key().await?;

        let mut validation = Validation::new(signing.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let data = decode::<Claims>(token, &signing.key, &validation).map_err(|e| {
            tracing::warn!(error = %e, "Token validation failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        Ok(UserContext::new(
            claims.sub,
            claims.email.unwrap_or_default(),
            claims.roles.map(Vec::from).unwrap_or_default(),
            claims.email_verified.unwrap_or(false),
        ))
    }

    fn name(&self) -> &'static str {
        "fm-auth-service"
    }
}
