use std::collections::BTreeMap;

/// HTTP method of an intercepted request.
///
/// Only GET participates in caching; everything else is forwarded to the
/// network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// An intercepted in-flight request.
///
/// Header names are stored lowercased so lookups are case-insensitive.
/// The navigation flag marks requests that load a full page rather than a
/// sub-resource; it drives the offline-fallback decision.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    navigate: bool,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            navigate: false,
        }
    }

    /// A plain GET request for a sub-resource.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// A GET request whose purpose is to load a full page.
    pub fn navigation(url: impl Into<String>) -> Self {
        let mut request = Self::new(Method::Get, url);
        request.navigate = true;
        request
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_navigation(&self) -> bool {
        self.navigate
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Identity under which this request is matched in a cache partition.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }

    /// Whether a failed fetch of this request should fall back to the
    /// offline page: navigations always, otherwise only when the `Accept`
    /// header prefers an HTML document. A missing `Accept` header means no.
    pub fn wants_html(&self) -> bool {
        self.navigate || self.header("accept").is_some_and(|v| v.contains("text/html"))
    }
}

// ============================================================================
// Tests
// ============================================================================
