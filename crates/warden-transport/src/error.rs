/// Errors that can occur in the transport layer.
///
/// None of these mean "the server said no"; they mean no usable response
/// arrived at all.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The URL could not be parsed or resolved against the base URL.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be built (bad header name or value, etc).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// `reqwest` failed to connect, send, or read the response.
    #[cfg(feature = "reqwest")]
    #[error("http request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Connecting, sending, or reading the response failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// No canned response was registered for this request (mock client).
    #[error("no response registered for {method} {url}")]
    Unroutable { method: String, url: String },
}
