//! Caching Strategies
//!
//! Network-first and cache-first response production. Neither strategy ever
//! fails: every network rejection ends in a cached or synthesized response.

use std::sync::Arc;

use crate::cache::CacheStorage;
use crate::events::Lifetime;
use crate::fetch::{Network, Request, Response};
use crate::router::{CacheStrategy, Namespace, Route};

/// Strategy runner shared by all fetch events.
#[derive(Clone)]
pub struct Strategies {
    caches: CacheStorage,
    network: Arc<dyn Network>,
    static_cache: String,
    dynamic_cache: String,
    root_url: String,
}

impl Strategies {
    pub fn new(
        caches: CacheStorage,
        network: Arc<dyn Network>,
        static_cache: String,
        dynamic_cache: String,
        root_url: String,
    ) -> Self {
        Self {
            caches,
            network,
            static_cache,
            dynamic_cache,
            root_url,
        }
    }

    fn cache_name(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Static => &self.static_cache,
            Namespace::Dynamic => &self.dynamic_cache,
        }
    }

    /// Produce the response for an intercepted request, or `None` when the
    /// route is a passthrough.
    pub async fn respond(
        &self,
        route: Route,
        request: &Request,
        lifetime: &mut Lifetime,
    ) -> Option<Response> {
        match route {
            Route::Passthrough => None,
            Route::Intercept {
                strategy: CacheStrategy::NetworkFirst,
                namespace,
                ..
            } => Some(self.network_first(request, namespace, lifetime).await),
            Route::Intercept {
                strategy: CacheStrategy::CacheFirst,
                namespace,
                ..
            } => Some(self.cache_first(request, namespace, lifetime).await),
        }
    }

    /// Prefer the live response; fall back to any cache, then to the cached
    /// root for navigations, then to a synthesized 503.
    pub async fn network_first(
        &self,
        request: &Request,
        namespace: Namespace,
        lifetime: &mut Lifetime,
    ) -> Response {
        let cache_name = self.cache_name(namespace);

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store_later(lifetime, cache_name, request, &response);
                }
                response
            }
            Err(e) => {
                log::debug!("[SW Fetch] Network failed for {}: {}", request.url, e);

                if let Some(cached) = self.caches.match_preferring(cache_name, request) {
                    return cached;
                }

                if request.is_navigation() {
                    let root = Request::new(self.root_url.clone());
                    return self
                        .caches
                        .match_preferring(&self.static_cache, &root)
                        .unwrap_or_else(|| Response::synthesized(503, "Offline"));
                }

                Response::synthesized(503, "Network error")
            }
        }
    }

    /// Serve any cached copy without touching the network; on a miss fetch
    /// and store into the dynamic namespace.
    pub async fn cache_first(
        &self,
        request: &Request,
        namespace: Namespace,
        lifetime: &mut Lifetime,
    ) -> Response {
        if let Some(cached) = self
            .caches
            .match_preferring(self.cache_name(namespace), request)
        {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store_later(lifetime, &self.dynamic_cache, request, &response);
                }
                response
            }
            Err(e) => {
                log::debug!("[SW Fetch] Cache miss and network failed for {}: {}", request.url, e);
                Response::synthesized(503, "Resource not available")
            }
        }
    }

    /// Schedule a cache write that the caller does not wait for.
    fn store_later(
        &self,
        lifetime: &mut Lifetime,
        cache_name: &str,
        request: &Request,
        response: &Response,
    ) {
        let caches = self.caches.clone();
        let cache_name = cache_name.to_string();
        let request = request.clone();
        let response = response.clone();
        lifetime.wait_until(async move {
            caches.put(&cache_name, request, response);
        });
    }
}
