//! Service location: logical service name → base URL.

use std::collections::BTreeMap;

use url::Url;

use crate::config::ServiceConfig;
use crate::config::ConfigError;

/// Resolves logical backend names. The pipeline depends only on this.
pub trait ServiceLocator: Send + Sync {
    fn resolve(&self, service: &str) -> Option<Url>;

    /// All known service names, sorted.
    fn services(&self) -> Vec<String>;
}

/// Locator backed by the `services` configuration section.
#[derive(Debug, Clone, Default)]
pub struct StaticServiceLocator {
    services: BTreeMap<String, Url>,
}

impl StaticServiceLocator {
    pub fn from_config(configs: &[ServiceConfig]) -> Result<Self, ConfigError> {
        let mut services = BTreeMap::new();
        for config in configs {
            services.insert(config.name.clone(), Url::parse(&config.url)?);
        }
        Ok(Self { services })
    }
}

impl ServiceLocator for StaticServiceLocator {
    fn resolve(&self, service: &str) -> Option<Url> {
        self.services.get(service).cloned()
    }

    fn services(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

/// Circuit breaker key for a backend: the first DNS label of its host
/// (`http://fm-case-service.ns.svc:8003` → `fm-case-service`). IP hosts
/// keep the full `ip:port` so distinct backends never share a breaker.
pub fn backend_name(base_url: &Url) -> String {
    match base_url.host() {
        Some(url::Host::Domain(domain)) => domain
            .split('.')
            .next()
            .unwrap_or(domain)
            .to_string(),
        Some(host) => match base_url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        },
        None => "unknown".to_string(),
    }
}
