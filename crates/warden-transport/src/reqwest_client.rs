//! [`HttpClient`] implementation backed by `reqwest`.

use url::Url;

use crate::{HttpClient, HttpRequest, HttpResponse, Method, TransportError};

/// A `reqwest`-based [`HttpClient`].
///
/// OAuth2 endpoints are usually configured as paths (`/token`), the way a
/// browser app would address its own origin. Give the client a base URL
/// with [`with_base_url`](Self::with_base_url) and relative request URLs
/// are resolved against it; absolute URLs pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom `reqwest::Client` (connection pool reuse, proxies,
    /// timeouts).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Resolve relative request URLs against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn resolve(&self, raw: &str) -> Result<Url, TransportError> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(raw).map_err(|e| TransportError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                }),
                None => Err(TransportError::InvalidUrl {
                    url: raw.to_string(),
                    reason: "relative url and no base url configured".into(),
                }),
            },
            Err(e) => Err(TransportError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(TransportError::Http)?.to_vec();

        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
