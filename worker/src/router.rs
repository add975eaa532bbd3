//! Request Classifier
//!
//! Decides, from the URL shape alone, whether the worker intercepts a request
//! and which strategy and namespace serve it. Performs no I/O.

use std::fmt;

use serde::Serialize;

use crate::config::WorkerConfig;
use crate::fetch::{Request, RequestMethod, Url};

// ── Types ───────────────────────────────────────────────────

/// Caching strategy for intercepted requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    /// Try network first; on failure, fall back to cache.
    NetworkFirst,
    /// Try cache first; on miss, fetch from network and cache the result.
    CacheFirst,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkFirst => f.write_str("network-first"),
            Self::CacheFirst => f.write_str("cache-first"),
        }
    }
}

/// Which of the two canonical namespaces a route uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    Static,
    Dynamic,
}

impl Namespace {
    /// Versioned cache name for this namespace.
    pub fn cache_name(&self, config: &WorkerConfig) -> String {
        match self {
            Self::Static => config.static_cache(),
            Self::Dynamic => config.dynamic_cache(),
        }
    }
}

/// Why a route was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteReason {
    Api,
    StaticAsset,
    Navigation,
    Default,
}

/// Classification of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "kebab-case")]
pub enum Route {
    /// The worker does not intervene; the host's default fetch applies.
    Passthrough,
    Intercept {
        strategy: CacheStrategy,
        namespace: Namespace,
        reason: RouteReason,
    },
}

// ── Classification ──────────────────────────────────────────

/// Classify a request. First match wins: API pattern, static asset,
/// navigation, default.
pub fn classify(request: &Request, config: &WorkerConfig) -> Route {
    if request.method != RequestMethod::Get {
        return Route::Passthrough;
    }

    let url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("[SW Fetch] Not intercepting {}: {}", request.url, e);
            return Route::Passthrough;
        }
    };
    if config
        .cache
        .passthrough_schemes
        .iter()
        .any(|scheme| scheme.eq_ignore_ascii_case(&url.scheme))
    {
        return Route::Passthrough;
    }

    let (strategy, namespace, reason) = if is_api(&url.path, config) {
        (CacheStrategy::NetworkFirst, Namespace::Dynamic, RouteReason::Api)
    } else if is_static(&url.path, config) {
        (
            CacheStrategy::CacheFirst,
            Namespace::Static,
            RouteReason::StaticAsset,
        )
    } else if request.is_navigation() {
        (
            CacheStrategy::NetworkFirst,
            Namespace::Static,
            RouteReason::Navigation,
        )
    } else {
        (
            CacheStrategy::CacheFirst,
            Namespace::Dynamic,
            RouteReason::Default,
        )
    };

    Route::Intercept {
        strategy,
        namespace,
        reason,
    }
}

fn is_api(path: &str, config: &WorkerConfig) -> bool {
    config.api_patterns().iter().any(|re| re.is_match(path))
}

fn is_static(path: &str, config: &WorkerConfig) -> bool {
    config.cache.static_resources.iter().any(|p| p == path)
        || config
            .cache
            .static_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(request: Request) -> Route {
        classify(&request, &WorkerConfig::default())
    }

    fn intercept(strategy: CacheStrategy, namespace: Namespace, reason: RouteReason) -> Route {
        Route::Intercept {
            strategy,
            namespace,
            reason,
        }
    }

    #[test]
    fn non_get_passes_through() {
        let request = Request::new("http://localhost:3000/api/wishlist/add")
            .with_method(RequestMethod::Post);
        assert_eq!(route(request), Route::Passthrough);
    }

    #[test]
    fn extension_scheme_passes_through() {
        assert_eq!(
            route(Request::new("chrome-extension://abcdef/inject.js")),
            Route::Passthrough
        );
    }

    #[test]
    fn api_paths_are_network_first() {
        for path in ["/api/flats", "/api/flats/17?rooms=2", "/api/flatmates/search", "/api/wishlist"] {
            assert_eq!(
                route(Request::new(format!("http://localhost:3000{path}"))),
                intercept(CacheStrategy::NetworkFirst, Namespace::Dynamic, RouteReason::Api),
                "{path}"
            );
        }
    }

    #[test]
    fn api_beats_navigation() {
        assert_eq!(
            route(Request::navigate("http://localhost:3000/api/flats")),
            intercept(CacheStrategy::NetworkFirst, Namespace::Dynamic, RouteReason::Api)
        );
    }

    #[test]
    fn static_assets_are_cache_first() {
        let expected = intercept(
            CacheStrategy::CacheFirst,
            Namespace::Static,
            RouteReason::StaticAsset,
        );
        assert_eq!(route(Request::new("http://localhost:3000/manifest.json")), expected);
        assert_eq!(route(Request::new("http://localhost:3000/static/media/logo.svg")), expected);
        assert_eq!(route(Request::new("http://localhost:3000/icons/favicon.ico")), expected);
    }

    #[test]
    fn root_navigation_is_static_asset() {
        assert_eq!(
            route(Request::navigate("http://localhost:3000/")),
            intercept(
                CacheStrategy::CacheFirst,
                Namespace::Static,
                RouteReason::StaticAsset
            )
        );
    }

    #[test]
    fn navigation_is_network_first_static() {
        assert_eq!(
            route(Request::navigate("http://localhost:3000/find-flatmates")),
            intercept(
                CacheStrategy::NetworkFirst,
                Namespace::Static,
                RouteReason::Navigation
            )
        );
    }

    #[test]
    fn everything_else_is_cache_first_dynamic() {
        assert_eq!(
            route(Request::new("https://fonts.example.com/inter.woff2")),
            intercept(CacheStrategy::CacheFirst, Namespace::Dynamic, RouteReason::Default)
        );
    }

    #[test]
    fn unparsable_url_passes_through() {
        assert_eq!(route(Request::new("not a url")), Route::Passthrough);
    }
}
