//! Outbound HTTP abstraction for Warden.
//!
//! Provides the [`HttpClient`] trait that every network call in Warden goes
//! through: token requests, refreshes, revocations, and authorized
//! application requests. The authenticator and the session store never
//! talk to a concrete HTTP library directly.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestClient`], backed by `reqwest`
//! - `mock`: [`MockHttpClient`], canned responses for tests

mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "reqwest")]
mod reqwest_client;

pub use error::TransportError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockHttpClient;
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;

use std::fmt;

/// Content type of OAuth2 token and revocation requests.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Sends a request and returns the full response.
///
/// A non-2xx status is NOT an error at this layer: the response is
/// returned as-is and the caller decides what a 401 or 400 means. Only
/// failures to get any response at all are [`TransportError`]s.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request.
///
/// Header names are compared case-insensitively; setting a header that is
/// already present replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Sets a header, replacing any existing header with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Sets an already-encoded form body and the matching content type.
    #[must_use]
    pub fn form(self, encoded: impl Into<String>) -> Self {
        self.header("Content-Type", FORM_CONTENT_TYPE)
            .body(encoded.into().into_bytes())
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The body as UTF-8 text, if there is one and it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// A response as seen by Warden: status, headers, and the full body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
