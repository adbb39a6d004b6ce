//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest prefix wins; ties keep configuration order
//! - Prefixes match whole path segments (`/api/v1/cases` does not
//!   match `/api/v1/casesx`)
//! - O(n) prefix scan (acceptable for typical route counts)

use crate::config::RouteConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path_prefix: String,
    pub service: String,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn from_config(configs: Vec<RouteConfig>) -> Self {
        let mut routes: Vec<Route> = configs
            .into_iter()
            .map(|c| Route {
                path_prefix: c.path_prefix.trim_end_matches('/').to_string(),
                service: c.service,
            })
            .collect();
        // Stable sort keeps configuration order among equal lengths.
        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));

        tracing::info!(routes = routes.len(), "Router compiled");
        Self { routes }
    }

    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| prefix_matches(&route.path_prefix, path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        // An empty prefix is the catch-all `/` route.
        Some(rest) => prefix.is_empty() || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(routes: &[(&str, &str)]) -> Router {
        Router::from_config(
            routes
                .iter()
                .map(|(prefix, service)| RouteConfig {
                    path_prefix: prefix.to_string(),
                    service: service.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = router(&[
            ("/api/v1", "default"),
            ("/api/v1/cases", "case"),
            ("/api/v1/cases/search", "search"),
        ]);

        assert_eq!(router.match_path("/api/v1/cases/123").unwrap().service, "case");
        assert_eq!(router.match_path("/api/v1/cases/search").unwrap().service, "search");
        assert_eq!(router.match_path("/api/v1/sessions").unwrap().service, "default");
    }

    #[test]
    fn test_segment_boundary() {
        let router = router(&[("/api/v1/cases", "case")]);

        assert!(router.match_path("/api/v1/cases").is_some());
        assert!(router.match_path("/api/v1/cases/").is_some());
        assert!(router.match_path("/api/v1/casesx").is_none());
        assert!(router.match_path("/api/v1").is_none());
    }

    #[test]
    fn test_trailing_slash_in_config() {
        let router = router(&[("/api/v1/knowledge/", "knowledge")]);
        assert_eq!(
            router.match_path("/api/v1/knowledge/docs").unwrap().service,
            "knowledge"
        );
    }

    #[test]
    fn test_root_catch_all() {
        let router = router(&[("/", "web"), ("/api", "api")]);

        assert_eq!(router.match_path("/api/x").unwrap().service, "api");
        assert_eq!(router.match_path("/index.html").unwrap().service, "web");
        assert_eq!(router.match_path("/").unwrap().service, "web");
    }

    #[test]
    fn test_no_match() {
        let router = router(&[("/api/v1/cases", "case")]);
        assert!(router.match_path("/other").is_none());
        assert!(Router::default().match_path("/").is_none());
    }
}
