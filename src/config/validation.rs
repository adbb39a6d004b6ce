//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing services)
//! - Validate value ranges (limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{AuthProvider, GatewayConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.auth.provider != AuthProvider::FmAuthService {
        errors.push(ValidationError::new(
            "auth.provider",
            format!("'{}' is not implemented", config.auth.provider.as_str()),
        ));
    }
    if Url::parse(&config.auth.service_url).is_err() {
        errors.push(ValidationError::new("auth.service_url", "not a valid URL"));
    }

    if config.rate_limit.requests_per_minute == 0 {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_minute",
            "must be greater than zero",
        ));
    }
    if config.rate_limit.burst_size == Some(0) {
        errors.push(ValidationError::new("rate_limit.burst_size", "must be at least 1"));
    }

    if config.circuit_breaker.fail_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.fail_threshold",
            "must be greater than zero",
        ));
    }
    if config.circuit_breaker.half_open_max_calls == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.half_open_max_calls",
            "must be greater than zero",
        ));
    }

    if config.timeouts.backend_request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.backend_request_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.store_probe_interval_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.store_probe_interval_secs",
            "must be greater than zero",
        ));
    }

    if let Some(url) = &config.redis.url {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "redis" | "rediss") => {}
            _ => errors.push(ValidationError::new(
                "redis.url",
                "must be a redis:// or rediss:// URL",
            )),
        }
    }

    let mut names = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::new(
                format!("services[{i}].name"),
                format!("duplicate service '{}'", service.name),
            ));
        }
        match Url::parse(&service.url) {
            Ok(url) if url.host_str().is_some() => {}
            _ => errors.push(ValidationError::new(
                format!("services[{i}].url"),
                format!("'{}' is not an absolute URL", service.url),
            )),
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("routes[{i}].path_prefix"),
                "must start with '/'",
            ));
        }
        if !names.contains(route.service.as_str()) {
            errors.push(ValidationError::new(
                format!("routes[{i}].service"),
                format!("unknown service '{}'", route.service),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, ServiceConfig};

    fn service(name: &str, url: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_route_to_unknown_service() {
        let mut config = GatewayConfig::default();
        config.services.push(service("case", "http://fm-case-service:8003"));
        config.routes.push(RouteConfig {
            path_prefix: "/api/v1/knowledge".into(),
            service: "knowledge".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "routes[0].service");
    }

    #[test]
    fn test_duplicate_and_malformed_services() {
        let mut config = GatewayConfig::default();
        config.services.push(service("case", "http://fm-case-service:8003"));
        config.services.push(service("case", "not a url"));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["services[1].name", "services[1].url"]);
    }

    #[test]
    fn test_unimplemented_provider_rejected() {
        let mut config = GatewayConfig::default();
        config.auth.provider = AuthProvider::Auth0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].to_string(), "auth.provider: 'auth0' is not implemented");
    }

    #[test]
    fn test_redis_url_scheme() {
        let mut config = GatewayConfig::default();
        config.redis.url = Some("http://localhost:6379".into());
        assert!(validate_config(&config).is_err());

        config.redis.url = Some("redis://localhost:6379/0".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = GatewayConfig::default();
        config.rate_limit.burst_size = Some(0);
        config.circuit_breaker.half_open_max_calls = 0;
        config.timeouts.backend_request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
