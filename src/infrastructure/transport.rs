//! HTTP seam between resource controllers and the remote API.
//!
//! Controllers only see the [`Transport`] trait. [`ReqwestTransport`] talks
//! to the real service; [`ScriptedTransport`] records requests and replays
//! canned responses, optionally holding a reply until a test releases it.

use crate::domain::RequestError;
use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully resolved outgoing request. `path` is relative to the API base.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: RequestMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer_token: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests against the remote API.
///
/// Implementations report only transport-level problems (no response at
/// all) as errors; any HTTP status, 2xx or not, is a successful execution.
#[async_trait(?Send)]
pub trait Transport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The reqwest request for `request`, resolved against the base URL.
    fn build(&self, request: &HttpRequest) -> Result<reqwest::Request, reqwest::Error> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.into(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder.build()
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let built = self.build(&request).map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "request could not be built");
            RequestError::transport(e.to_string())
        })?;
        let url = built.url().clone();
        let response = self.client.execute(built).await.map_err(|e| {
            tracing::warn!(%url, error = %e, "request failed before a response arrived");
            RequestError::transport(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Releases a reply previously reserved with [`ScriptedTransport::hold`].
pub struct HeldReply {
    sender: oneshot::Sender<Result<HttpResponse, RequestError>>,
}

impl HeldReply {
    pub fn release(self, reply: Result<HttpResponse, RequestError>) {
        let _ = self.sender.send(reply);
    }

    pub fn release_json(self, status: u16, body: Value) {
        self.release(Ok(HttpResponse::json(status, &body)));
    }
}

enum Reply {
    Ready(Result<HttpResponse, RequestError>),
    Held(oneshot::Receiver<Result<HttpResponse, RequestError>>),
}

struct ScriptedReply {
    route: Option<(RequestMethod, String)>,
    reply: Reply,
}

/// In-memory transport that records every request and answers from a script.
///
/// Replies registered with [`on`](Self::on) only match their method and
/// path; the others match any request. The first matching reply is used
/// and consumed. A request with no matching reply fails as a transport
/// error.
#[derive(Default)]
pub struct ScriptedTransport {
    requests: RefCell<Vec<HttpRequest>>,
    replies: RefCell<VecDeque<ScriptedReply>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Result<HttpResponse, RequestError>) {
        self.push(None, Reply::Ready(reply));
    }

    pub fn reply_json(&self, status: u16, body: Value) {
        self.reply(Ok(HttpResponse::json(status, &body)));
    }

    pub fn on(&self, method: RequestMethod, path: impl Into<String>, status: u16, body: Value) {
        self.push(
            Some((method, path.into())),
            Reply::Ready(Ok(HttpResponse::json(status, &body))),
        );
    }

    pub fn on_error(&self, method: RequestMethod, path: impl Into<String>, error: RequestError) {
        self.push(Some((method, path.into())), Reply::Ready(Err(error)));
    }

    /// Reserves the next reply; the request waits until the handle is released.
    pub fn hold(&self) -> HeldReply {
        let (sender, receiver) = oneshot::channel();
        self.push(None, Reply::Held(receiver));
        HeldReply { sender }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    fn push(&self, route: Option<(RequestMethod, String)>, reply: Reply) {
        self.replies.borrow_mut().push_back(ScriptedReply { route, reply });
    }

    fn take_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut replies = self.replies.borrow_mut();
        let index = replies.iter().position(|scripted| match &scripted.route {
            Some((method, path)) => *method == request.method && *path == request.path,
            None => true,
        })?;
        replies.remove(index).map(|scripted| scripted.reply)
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let reply = self.take_reply(&request);
        self.requests.borrow_mut().push(request);
        match reply {
            Some(Reply::Ready(reply)) => reply,
            Some(Reply::Held(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(RequestError::transport("held reply dropped"))),
            None => Err(RequestError::transport("no scripted reply")),
        }
    }
}
