//! In-memory [`HttpClient`] with canned responses.
//!
//! Register replies per `(method, url)`; every request is recorded so tests
//! can assert on what was sent. Replies for a route are served in order and
//! the last one sticks, so a route registered once answers every call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::{HttpClient, HttpRequest, HttpResponse, Method, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail(String),
}

/// Test double for [`HttpClient`].
///
/// ```rust
/// # use warden_transport::{HttpClient, HttpRequest, Method, MockHttpClient};
/// # tokio_test_block(async {
/// let http = MockHttpClient::new();
/// http.respond(Method::Post, "/token", 200, r#"{"access_token":"t"}"#);
///
/// let res = http.send(HttpRequest::post("/token")).await.unwrap();
/// assert_eq!(res.status, 200);
/// assert_eq!(http.calls(Method::Post, "/token"), 1);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and body.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.push(method, url, Reply::Respond(HttpResponse::new(status, body)));
    }

    /// Queues a full response (custom headers, etc).
    pub fn respond_with(&self, method: Method, url: &str, response: HttpResponse) {
        self.push(method, url, Reply::Respond(response));
    }

    /// Queues a transport-level failure (no response at all).
    pub fn fail(&self, method: Method, url: &str, message: &str) {
        self.push(method, url, Reply::Fail(message.to_string()));
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock_requests().clone()
    }

    /// Requests sent to one route, oldest first.
    pub fn requests_to(&self, method: Method, url: &str) -> Vec<HttpRequest> {
        self.lock_requests()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .cloned()
            .collect()
    }

    pub fn calls(&self, method: Method, url: &str) -> usize {
        self.requests_to(method, url).len()
    }

    pub fn last_request(&self, method: Method, url: &str) -> Option<HttpRequest> {
        self.requests_to(method, url).pop()
    }

    fn push(&self, method: Method, url: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .entry((method, url.to_string()))
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, method: Method, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let queue = routes.get_mut(&(method, url.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<HttpRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        self.lock_requests().push(request);

        match self.next_reply(method, &url) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError::RequestFailed(message)),
            None => Err(TransportError::Unroutable {
                method: method.to_string(),
                url,
            }),
        }
    }
}
