//! Fetch Primitives
//!
//! Request and response values seen by the worker, URL parsing, and the
//! network seam every live fetch goes through.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, WorkerError};

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RequestMethod {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parse a method name, ignoring case.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Same-origin only
    SameOrigin,
    /// No CORS
    NoCors,
    /// CORS
    #[default]
    Cors,
    /// Top-level page navigation
    Navigate,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// HTTP method
    #[serde(default)]
    pub method: RequestMethod,
    /// Request mode
    #[serde(default)]
    pub mode: RequestMode,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
    /// Set when the request was deferred for background replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<u64>,
}

impl Request {
    /// Create a new GET request
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            mode: RequestMode::Cors,
            headers: BTreeMap::new(),
            body: None,
            queue_id: None,
        }
    }

    /// Create a page navigation request
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url).with_mode(RequestMode::Navigate)
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether this is a top-level navigation rather than a sub-resource fetch.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    /// Same-origin network response
    Basic,
    /// Cross-origin network response
    Cors,
    /// Built by the worker itself
    #[default]
    Default,
    /// Opaque cross-origin response
    Opaque,
}

/// A response returned to the page or stored in a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Response type
    #[serde(default)]
    pub response_type: ResponseType,
    /// Status code
    pub status: u16,
    /// Status text
    #[serde(default)]
    pub status_text: String,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response with an empty body
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// A plain-text response built by the worker (offline pages, errors).
    pub fn synthesized(status: u16, message: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(message.as_bytes().to_vec())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Check if response is OK (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Get status text for status code
fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// The live network. `Err` means the fetch was rejected (offline, DNS,
/// timeout); HTTP error statuses come back as `Ok`.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// URL scheme, lowercased.
    pub scheme: String,
    /// Host name.
    pub host: String,
    /// Explicit port, if one was given.
    pub port: Option<u16>,
    /// Path, always starting with `/`.
    pub path: String,
    /// Query string.
    pub query: Option<String>,
}

impl Url {
    /// Parse an absolute URL string.
    pub fn parse(url: &str) -> Result<Self, WorkerError> {
        let url = url.trim();

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| WorkerError::InvalidUrl(format!("missing scheme: {url}")))?;
        if scheme.is_empty() {
            return Err(WorkerError::InvalidUrl(format!("missing scheme: {url}")));
        }

        let (host_port, path_query) = match rest.find(['/', '?', '#']) {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };

        let (host, port) = match host_port.rfind(':') {
            Some(pos) => {
                let port = host_port[pos + 1..]
                    .parse::<u16>()
                    .map_err(|_| WorkerError::InvalidUrl(format!("invalid port: {url}")))?;
                (&host_port[..pos], Some(port))
            }
            None => (host_port, None),
        };

        let path_query = match path_query.find('#') {
            Some(pos) => &path_query[..pos],
            None => path_query,
        };

        let (path, query) = match path_query.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (path_query, None),
        };

        let path = if path.is_empty() { "/" } else { path };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
            path: path.to_string(),
            query,
        })
    }

    /// Resolve `input` against `base`: root-relative paths are joined to the
    /// base origin, absolute URLs are returned unchanged.
    pub fn resolve(base: &str, input: &str) -> Result<String, WorkerError> {
        if input.starts_with('/') && !input.starts_with("//") {
            let base = Self::parse(base)?;
            Ok(format!("{}{}", base.origin(), input))
        } else {
            Self::parse(input)?;
            Ok(input.to_string())
        }
    }

    /// `scheme://host[:port]`
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    /// Whether this URL uses plain http or https.
    pub fn is_http(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_creation() {
        let req = Request::new("https://example.com/page");
        assert_eq!(req.url, "https://example.com/page");
        assert_eq!(req.method, RequestMethod::Get);
        assert!(req.body.is_none());
        assert!(!req.is_navigation());
    }

    #[test]
    fn test_navigation_request() {
        let req = Request::navigate("https://example.com/");
        assert!(req.is_navigation());
    }

    #[test]
    fn test_request_method_parse() {
        assert_eq!(RequestMethod::parse("post"), Some(RequestMethod::Post));
        assert_eq!(RequestMethod::parse("GET"), Some(RequestMethod::Get));
        assert_eq!(RequestMethod::parse("BREW"), None);
        assert_eq!(RequestMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_response_ok_range() {
        assert!(Response::new(200).ok());
        assert!(Response::new(204).ok());
        assert!(Response::new(299).ok());
        assert!(!Response::new(300).ok());
        assert!(!Response::new(404).ok());
        assert!(!Response::new(503).ok());
    }

    #[test]
    fn test_synthesized_response() {
        let resp = Response::synthesized(503, "Offline");
        assert_eq!(resp.status, 503);
        assert_eq!(resp.status_text, "Service Unavailable");
        assert_eq!(resp.text(), Some("Offline"));
        assert_eq!(
            resp.headers.get("Content-Type").map(String::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_url_parse() {
        let url = Url::parse("https://FlatScout.app:8443/api/flats?city=leeds#top").unwrap();
        assert_eq!(url.scheme, "https");
        assert_eq!(url.host, "flatscout.app");
        assert_eq!(url.port, Some(8443));
        assert_eq!(url.path, "/api/flats");
        assert_eq!(url.query.as_deref(), Some("city=leeds"));
        assert_eq!(url.origin(), "https://flatscout.app:8443");
    }

    #[test]
    fn test_url_parse_bare_host() {
        let url = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(url.path, "/");
        let url = Url::parse("http://localhost?x=1").unwrap();
        assert_eq!(url.path, "/");
        assert_eq!(url.query.as_deref(), Some("x=1"));
    }

    #[test]
    fn test_url_extension_scheme() {
        let url = Url::parse("chrome-extension://abcdef/popup.html").unwrap();
        assert_eq!(url.scheme, "chrome-extension");
        assert!(!url.is_http());
    }

    #[test]
    fn test_url_rejects_missing_scheme() {
        assert!(matches!(
            Url::parse("/relative/path"),
            Err(WorkerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_resolve() {
        assert_eq!(
            Url::resolve("http://localhost:3000", "/static/js/bundle.js").unwrap(),
            "http://localhost:3000/static/js/bundle.js"
        );
        assert_eq!(
            Url::resolve("http://localhost:3000/app/", "https://cdn.example.com/x.css").unwrap(),
            "https://cdn.example.com/x.css"
        );
    }
}
