//! The credential validation seam.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::auth::context::UserContext;
use crate::auth::error::AuthError;
use crate::auth::jwks::JwksValidator;
use crate::config::{AuthConfig, AuthProvider, ConfigError};

/// Turns a bearer credential into a caller identity.
///
/// Implementations are chosen once at startup from [`AuthProvider`]; the
/// request path only ever sees `Arc<dyn TokenValidator>`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<UserContext, AuthError>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Build the configured validator.
///
/// Providers that are reserved in configuration but not implemented fail
/// here, so a misconfigured gateway never starts serving.
pub fn build_validator(config: &AuthConfig) -> Result<Arc<dyn TokenValidator>, ConfigError> {
    match config.provider {
        AuthProvider::FmAuthService => {
            let jwks_url = Url::parse(&format!(
                "{}/.well-known/jwks.json",
                config.service_url.trim_end_matches('/')
            ))?;
            let validator = JwksValidator::new(
                jwks_url,
                &config.issuer,
                &config.audience,
                Duration::from_secs(config.jwks_cache_ttl_secs),
                Duration::from_secs(config.jwks_timeout_secs),
            )?;
            Ok(Arc::new(validator))
        }
        other => Err(ConfigError::ProviderNotImplemented(other.as_str().to_string())),
    }
}

/// Extract the credential from an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated parts and the scheme
/// must be `Bearer` in any case.
pub fn extract_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer abc"), Ok("abc"));
        assert_eq!(extract_bearer("BEARER   abc"), Ok("abc"));
    }

    #[test]
    fn test_extract_bearer_rejects_malformed() {
        assert_eq!(extract_bearer("Bearer"), Err(AuthError::MalformedHeader));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), Err(AuthError::MalformedHeader));
        assert_eq!(extract_bearer("Bearer a b"), Err(AuthError::MalformedHeader));
        assert_eq!(extract_bearer(""), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn test_reserved_providers_fail_at_build() {
        let config = AuthConfig {
            provider: AuthProvider::Supabase,
            ..AuthConfig::default()
        };
        match build_validator(&config) {
            Err(ConfigError::ProviderNotImplemented(name)) => assert_eq!(name, "supabase"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("supabase must not build"),
        }
    }

    #[test]
    fn test_primary_provider_builds() {
        let validator = build_validator(&AuthConfig::default()).unwrap();
        assert_eq!(validator.name(), "fm-auth-service");
    }
}
