//! Worker configuration.
//!
//! One immutable [`WorkerConfig`] is built when the worker starts (defaults,
//! or a TOML file) and shared as `Arc<WorkerConfig>` by every handler.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fetch::Url;
use crate::push::NotificationAction;

/// Top-level worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Display name, used as the default notification title.
    pub app_name: String,
    /// Origin the worker is registered for.
    pub origin: String,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    pub notifications: NotificationDefaults,
    /// Compiled `cache.api_patterns`.
    #[serde(skip)]
    api_patterns: Vec<Regex>,
}

/// Cache namespaces and URL classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix of every namespace name.
    pub prefix: String,
    /// Version suffix. Bump it whenever `static_resources` changes.
    pub version: String,
    /// Exact paths pre-cached at install.
    pub static_resources: Vec<String>,
    /// Path prefixes served cache-first from the static namespace.
    pub static_prefixes: Vec<String>,
    /// Regular expressions over the URL path routed network-first.
    pub api_patterns: Vec<String>,
    /// Schemes the worker never intercepts.
    pub passthrough_schemes: Vec<String>,
}

/// Background sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub wishlist_tag: String,
    pub review_tag: String,
    /// Path segment identifying wishlist mutations.
    pub wishlist_path: String,
}

/// Defaults applied when normalizing push payloads, plus click routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub urgent_vibration: Vec<u32>,
    pub default_vibration: Vec<u32>,
    pub fallback_title: String,
    pub fallback_body: String,
    /// Target when no URL or route applies.
    pub default_route: String,
    pub actions: Vec<NotificationAction>,
    /// Notification `type` → path template. `{flatId}` is interpolated.
    pub routes: BTreeMap<String, String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let cache = CacheConfig::default();
        let api_patterns = compile_patterns(&cache.api_patterns).unwrap_or_default();
        Self {
            app_name: "FlatScout".to_string(),
            origin: "http://localhost:3000".to_string(),
            cache,
            sync: SyncConfig::default(),
            notifications: NotificationDefaults::default(),
            api_patterns,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: "flatscout".to_string(),
            version: "2.0.0".to_string(),
            static_resources: [
                "/",
                "/static/js/bundle.js",
                "/static/css/main.css",
                "/manifest.json",
                "/icons/icon-192x192.png",
                "/icons/icon-512x512.png",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            static_prefixes: vec!["/static/".to_string(), "/icons/".to_string()],
            api_patterns: vec![
                "/api/flats".to_string(),
                "/api/flatmates".to_string(),
                "/api/wishlist".to_string(),
            ],
            passthrough_schemes: vec!["chrome-extension".to_string()],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            wishlist_tag: "wishlist-sync".to_string(),
            review_tag: "review-sync".to_string(),
            wishlist_path: "/api/wishlist".to_string(),
        }
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        let routes = [
            ("new_flat", "/flat-details/{flatId}"),
            ("new_flatmate", "/find-flatmates"),
            ("wishlist_update", "/wishlist"),
            ("connection_request", "/profile"),
            ("new_message", "/chat"),
            ("booking_request", "/booking-calendar"),
            ("new_match", "/find-flatmates"),
        ]
        .iter()
        .map(|(kind, path)| (kind.to_string(), path.to_string()))
        .collect();

        Self {
            body: "You have a new notification".to_string(),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/icon-192x192.png".to_string(),
            tag: "flatscout-notification".to_string(),
            actions: vec![
                NotificationAction::new("view", "View"),
                NotificationAction::new("dismiss", "Dismiss"),
            ],
            urgent_vibration: vec![300, 100, 300, 100, 300],
            default_vibration: vec![200, 100, 200],
            fallback_title: "FlatScout".to_string(),
            fallback_body: "You have a new notification".to_string(),
            default_route: "/dashboard".to_string(),
            routes,
        }
    }
}

impl WorkerConfig {
    /// Parse and validate a configuration from a TOML file path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io(e)
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string. Missing keys
    /// take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Check invariants and compile the API patterns.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.cache.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }

        match Url::parse(&self.origin) {
            Ok(url) if url.is_http() => {}
            _ => return Err(ConfigError::InvalidOrigin(self.origin.clone())),
        }

        for (kind, template) in &self.notifications.routes {
            if !template.starts_with('/') {
                return Err(ConfigError::InvalidRoute {
                    kind: kind.clone(),
                    template: template.clone(),
                });
            }
        }
        if !self.notifications.default_route.starts_with('/') {
            return Err(ConfigError::InvalidRoute {
                kind: "default".to_string(),
                template: self.notifications.default_route.clone(),
            });
        }

        self.api_patterns = compile_patterns(&self.cache.api_patterns)?;
        Ok(self)
    }

    /// `{prefix}-static-v{version}`
    pub fn static_cache(&self) -> String {
        format!("{}-static-v{}", self.cache.prefix, self.cache.version)
    }

    /// `{prefix}-dynamic-v{version}`
    pub fn dynamic_cache(&self) -> String {
        format!("{}-dynamic-v{}", self.cache.prefix, self.cache.version)
    }

    /// `{prefix}-v{version}`. Reserved; no strategy writes to it.
    pub fn general_cache(&self) -> String {
        format!("{}-v{}", self.cache.prefix, self.cache.version)
    }

    /// Names that survive activation.
    pub fn canonical_caches(&self) -> [String; 2] {
        [self.static_cache(), self.dynamic_cache()]
    }

    /// Compiled API route patterns.
    pub fn api_patterns(&self) -> &[Regex] {
        &self.api_patterns
    }

    /// Absolute URL of a path on the worker's origin.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), path)
    }

    /// The site root, used as the offline navigation fallback.
    pub fn root_url(&self) -> String {
        self.absolute("/")
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_names() {
        let config = WorkerConfig::default();
        assert_eq!(config.static_cache(), "flatscout-static-v2.0.0");
        assert_eq!(config.dynamic_cache(), "flatscout-dynamic-v2.0.0");
        assert_eq!(config.general_cache(), "flatscout-v2.0.0");
    }

    #[test]
    fn default_patterns_are_compiled() {
        let config = WorkerConfig::default();
        assert_eq!(config.api_patterns().len(), 3);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = WorkerConfig::from_toml_str("").unwrap();
        assert_eq!(config.app_name, "FlatScout");
        assert_eq!(config.cache.static_resources.len(), 6);
        assert_eq!(config.api_patterns().len(), 3);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = WorkerConfig::from_toml_str(
            r#"
            origin = "https://flatscout.example"

            [cache]
            version = "2.1.0"
            api_patterns = ["^/api/v2/"]
            "#,
        )
        .unwrap();
        assert_eq!(config.static_cache(), "flatscout-static-v2.1.0");
        assert_eq!(config.cache.prefix, "flatscout");
        assert_eq!(config.api_patterns().len(), 1);
        assert_eq!(config.root_url(), "https://flatscout.example/");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let result = WorkerConfig::from_toml_str("[cache]\napi_patterns = [\"(unclosed\"]\n");
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn empty_version_is_rejected() {
        let result = WorkerConfig::from_toml_str("[cache]\nversion = \"\"\n");
        assert!(matches!(result, Err(ConfigError::EmptyVersion)));
    }

    #[test]
    fn non_http_origin_is_rejected() {
        let result = WorkerConfig::from_toml_str("origin = \"ftp://files.example\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidOrigin(_))));
    }

    #[test]
    fn relative_route_is_rejected() {
        let result =
            WorkerConfig::from_toml_str("[notifications.routes]\nnew_flat = \"flat-details\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidRoute { .. })));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let result = WorkerConfig::from_toml_str("{{ not toml");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = WorkerConfig::from_path(Path::new("/nonexistent/flatscout-sw.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }
}
