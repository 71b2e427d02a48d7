//! Controller binding one remote operation to a [`RequestState`].
//!
//! A [`ResourceRequest`] owns the state of a single endpoint. Each
//! [`trigger`](ResourceRequest::trigger) moves the state to `Pending`
//! synchronously and hands back a [`Dispatch`] that performs the call when
//! polled. Calls are numbered; only the most recently issued call may write
//! its settlement, so a slow early response can never overwrite a newer
//! one. A dispatch dropped before it settles gives up its place: the state
//! goes back to what it showed before that call began, or to the outcome of
//! the newest call still standing.

use super::session::Session;
use crate::domain::{Checkpoint, RequestError, RequestState, RequestStatus, ValidationError};
use crate::infrastructure::{HttpRequest, HttpResponse, RequestMethod};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentifierSlot {
    None,
    Bound(String),
    PerCall,
}

/// Method and path of a remote operation, with an optional trailing
/// identifier segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: RequestMethod,
    path: String,
    identifier: IdentifierSlot,
}

impl Endpoint {
    /// An endpoint addressed by its path alone (`GET /project/`).
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            identifier: IdentifierSlot::None,
        }
    }

    /// An endpoint whose identifier is fixed up front (`GET /tasks/employee/{id}`).
    pub fn entity(method: RequestMethod, base: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            method,
            path: base.into(),
            identifier: IdentifierSlot::Bound(identifier.into()),
        }
    }

    /// An endpoint whose identifier is supplied with every call.
    pub fn per_entity(method: RequestMethod, base: impl Into<String>) -> Self {
        Self {
            method,
            path: base.into(),
            identifier: IdentifierSlot::PerCall,
        }
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full request path for a call, or an error when the identifier it
    /// needs is blank.
    pub fn resolve(&self, call_identifier: Option<&str>) -> Result<String, ValidationError> {
        let identifier = match (&self.identifier, call_identifier) {
            (_, Some(identifier)) => Some(identifier),
            (IdentifierSlot::Bound(identifier), None) => Some(identifier.as_str()),
            (IdentifierSlot::PerCall, None) => Some(""),
            (IdentifierSlot::None, None) => None,
        };
        match identifier {
            None => Ok(self.path.clone()),
            Some(identifier) if is_blank_identifier(identifier) => Err(ValidationError::BlankIdentifier {
                path: self.path.clone(),
            }),
            Some(identifier) => Ok(format!("{}/{}", self.path.trim_end_matches('/'), identifier.trim())),
        }
    }
}

/// Empty, whitespace, or a stringified missing value.
pub fn is_blank_identifier(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    trimmed.is_empty() || trimmed == "undefined" || trimmed == "null"
}

/// Per-call inputs to [`ResourceRequest::trigger`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    identifier: Option<String>,
    params: Vec<(String, String)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json_body(self, body: Value) -> Self {
        self.header("Content-Type", "application/json").body(body)
    }
}

/// How a dispatched call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    /// Latest call; its data was written to the state.
    Succeeded(T),
    /// Latest call; its error was written to the state.
    Failed(RequestError),
    /// A newer call was issued first. Carries the data when this one
    /// succeeded anyway, but the state was left alone.
    Superseded(Option<T>),
    /// The controller was dropped or the session closed before settlement.
    Discarded,
    /// Never sent.
    Rejected(ValidationError),
}

impl<T> Settlement<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            Settlement::Succeeded(data) | Settlement::Superseded(Some(data)) => Some(data),
            _ => None,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Settlement::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Settlement::Failed(_))
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Settlement::Failed(error) => Some(error),
            _ => None,
        }
    }
}

enum DispatchInner<T> {
    Rejected(ValidationError),
    InFlight(LocalBoxFuture<'static, Settlement<T>>),
    Discarded,
}

/// Handle to one triggered call.
///
/// Awaiting it yields `Some(data)` on success and `None` otherwise; use
/// [`settle`](Self::settle) for the full outcome. Nothing reaches the
/// transport until the dispatch is polled; dropping it unsettled withdraws
/// the call from the controller's state.
#[must_use = "a dispatch does nothing unless awaited or spawned"]
pub struct Dispatch<T> {
    inner: DispatchInner<T>,
}

impl<T: 'static> Dispatch<T> {
    fn rejected_with(error: ValidationError) -> Self {
        Self {
            inner: DispatchInner::Rejected(error),
        }
    }

    fn in_flight(future: LocalBoxFuture<'static, Settlement<T>>) -> Self {
        Self {
            inner: DispatchInner::InFlight(future),
        }
    }

    fn discarded() -> Self {
        Self {
            inner: DispatchInner::Discarded,
        }
    }

    /// The validation problem that stopped this call from being sent.
    pub fn rejected(&self) -> Option<&ValidationError> {
        match &self.inner {
            DispatchInner::Rejected(error) => Some(error),
            _ => None,
        }
    }

    pub async fn settle(self) -> Settlement<T> {
        match self.inner {
            DispatchInner::Rejected(error) => Settlement::Rejected(error),
            DispatchInner::InFlight(future) => future.await,
            DispatchInner::Discarded => Settlement::Discarded,
        }
    }
}

impl<T> Future for Dispatch<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            DispatchInner::InFlight(future) => future.as_mut().poll(cx).map(Settlement::into_data),
            DispatchInner::Rejected(_) | DispatchInner::Discarded => Poll::Ready(None),
        }
    }
}

struct Shared<T> {
    state: RequestState<T>,
    issued: u64,
    /// Calls that have neither settled nor been dropped, oldest first.
    in_flight: Vec<u64>,
    /// State before the oldest call in `in_flight` began.
    restore: Option<Checkpoint>,
    /// Newest outcome that arrived while a later call was still in flight.
    parked: Option<(u64, Result<T, RequestError>)>,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            state: RequestState::default(),
            issued: 0,
            in_flight: Vec::new(),
            restore: None,
            parked: None,
        }
    }

    fn begin(&mut self) -> u64 {
        if self.in_flight.is_empty() {
            self.restore = Some(self.state.checkpoint());
            self.parked = None;
        }
        self.issued += 1;
        self.in_flight.push(self.issued);
        self.state.begin();
        self.issued
    }

    /// Withdraws a call that will never settle.
    fn abandon(&mut self, seq: u64) {
        let Some(position) = self.in_flight.iter().position(|&pending| pending == seq) else {
            return;
        };
        self.in_flight.remove(position);
        tracing::debug!(seq, remaining = self.in_flight.len(), "dispatch dropped before settlement");
        if !self.in_flight.is_empty() {
            return;
        }
        match self.parked.take() {
            Some((parked, Ok(data))) => self.state.succeed(parked, data),
            Some((parked, Err(error))) => self.state.fail(parked, error),
            None => {
                if let Some(checkpoint) = self.restore.take() {
                    self.state.restore(checkpoint);
                }
            }
        }
        self.restore = None;
    }
}

impl<T: Clone> Shared<T> {
    fn settle(&mut self, seq: u64, outcome: Result<T, RequestError>) -> Settlement<T> {
        let Some(position) = self.in_flight.iter().position(|&pending| pending == seq) else {
            tracing::debug!(seq, latest = self.issued, "superseded settlement ignored");
            return Settlement::Superseded(outcome.ok());
        };
        if position + 1 < self.in_flight.len() {
            tracing::debug!(seq, latest = self.issued, "superseded settlement ignored");
            self.in_flight.remove(position);
            if self.parked.as_ref().is_none_or(|(parked, _)| *parked < seq) {
                self.parked = Some((seq, outcome.clone()));
            }
            return Settlement::Superseded(outcome.ok());
        }

        self.in_flight.clear();
        self.restore = None;
        self.parked = None;
        match outcome {
            Ok(data) => {
                self.state.succeed(seq, data.clone());
                Settlement::Succeeded(data)
            }
            Err(error) => {
                tracing::warn!(seq, %error, "request failed");
                self.state.fail(seq, error.clone());
                Settlement::Failed(error)
            }
        }
    }
}

/// Lives inside a dispatch future and withdraws its call if the future is
/// dropped before the settlement is written.
struct Withdrawal<T> {
    shared: Weak<RefCell<Shared<T>>>,
    seq: u64,
    settled: bool,
}

impl<T> Drop for Withdrawal<T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            if let Ok(mut shared) = shared.try_borrow_mut() {
                shared.abandon(self.seq);
            }
        }
    }
}

/// Weak handle to a controller, for work that happens after the view that
/// owns it may have gone away. Every operation is a no-op once the
/// controller is dropped.
pub struct RequestHandle<T> {
    session: Session,
    endpoint: Endpoint,
    shared: Weak<RefCell<Shared<T>>>,
}

impl<T> Clone for RequestHandle<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            endpoint: self.endpoint.clone(),
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> RequestHandle<T>
where
    T: DeserializeOwned + Clone + 'static,
{
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Same as [`ResourceRequest::trigger`]; settles as `Discarded` without
    /// a call when the controller is gone.
    pub fn trigger(&self, call: Call) -> Dispatch<T> {
        match self.shared.upgrade() {
            Some(shared) => dispatch(&self.session, &self.endpoint, &shared, call),
            None => Dispatch::discarded(),
        }
    }

    /// Applies `update` to the current data. Returns false when there is no
    /// data or the controller was dropped.
    pub fn modify_data(&self, update: impl FnOnce(&mut T)) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut shared = shared.borrow_mut();
        match shared.state.data_mut() {
            Some(data) => {
                update(data);
                true
            }
            None => false,
        }
    }

    pub fn set_data(&self, data: T) -> bool {
        match self.shared.upgrade() {
            Some(shared) => {
                shared.borrow_mut().state.set_data(data);
                true
            }
            None => false,
        }
    }
}

/// Controller for one endpoint, generic over the decoded payload.
pub struct ResourceRequest<T> {
    session: Session,
    endpoint: Endpoint,
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> ResourceRequest<T>
where
    T: DeserializeOwned + Clone + 'static,
{
    pub fn new(session: &Session, endpoint: Endpoint) -> Self {
        Self {
            session: session.clone(),
            endpoint,
            shared: Rc::new(RefCell::new(Shared::new())),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Borrow of the current state. Do not hold it across an await.
    pub fn state(&self) -> Ref<'_, RequestState<T>> {
        Ref::map(self.shared.borrow(), |shared| &shared.state)
    }

    pub fn status(&self) -> RequestStatus {
        self.shared.borrow().state.status()
    }

    pub fn is_pending(&self) -> bool {
        self.status() == RequestStatus::Pending
    }

    pub fn data(&self) -> Option<T> {
        self.shared.borrow().state.data().cloned()
    }

    pub fn error(&self) -> Option<RequestError> {
        self.shared.borrow().state.error().cloned()
    }

    pub fn handle(&self) -> RequestHandle<T> {
        RequestHandle {
            session: self.session.clone(),
            endpoint: self.endpoint.clone(),
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Starts a call. The state is `Pending` when this returns, unless the
    /// call was rejected locally, in which case nothing changed.
    pub fn trigger(&self, call: Call) -> Dispatch<T> {
        dispatch(&self.session, &self.endpoint, &self.shared, call)
    }
}

fn dispatch<T>(session: &Session, endpoint: &Endpoint, shared: &Rc<RefCell<Shared<T>>>, call: Call) -> Dispatch<T>
where
    T: DeserializeOwned + Clone + 'static,
{
    let method = endpoint.method();
    let path = match endpoint.resolve(call.identifier.as_deref()) {
        Ok(path) => path,
        Err(error) => {
            tracing::warn!(%method, path = %endpoint.path(), %error, "request not sent");
            return Dispatch::rejected_with(error);
        }
    };

    let seq = shared.borrow_mut().begin();

    let request = HttpRequest {
        method,
        path,
        query: call.params,
        headers: call.headers,
        body: call.body,
        bearer_token: session.tokens().bearer_token(),
    };
    tracing::debug!(seq, %method, path = %request.path, "request issued");

    let transport = session.transport();
    let session = session.clone();
    let mut withdrawal = Withdrawal {
        shared: Rc::downgrade(shared),
        seq,
        settled: false,
    };
    let future = async move {
        let outcome = transport.execute(request).await.and_then(decode_envelope::<T>);
        withdrawal.settled = true;
        apply_settlement(&withdrawal.shared, &session, seq, outcome)
    };
    Dispatch::in_flight(future.boxed_local())
}

/// Unwraps `{ "data": T }`. An empty body reads as `null`.
pub fn decode_envelope<T: DeserializeOwned>(response: HttpResponse) -> Result<T, RequestError> {
    if !response.is_success() {
        return Err(RequestError::rejected(response.status, &response.body));
    }
    let body = if response.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&response.body).map_err(|e| RequestError::decode(e.to_string()))?
    };
    let data = match body {
        Value::Object(mut envelope) => envelope.remove("data").unwrap_or(Value::Null),
        Value::Null => Value::Null,
        other => return Err(RequestError::decode(format!("expected an object envelope, got {other}"))),
    };
    serde_json::from_value(data).map_err(|e| RequestError::decode(e.to_string()))
}

fn apply_settlement<T: Clone>(
    shared: &Weak<RefCell<Shared<T>>>,
    session: &Session,
    seq: u64,
    outcome: Result<T, RequestError>,
) -> Settlement<T> {
    let Some(shared) = shared.upgrade() else {
        tracing::debug!(seq, "controller dropped before settlement");
        return Settlement::Discarded;
    };
    if !session.is_open() {
        tracing::debug!(seq, "session closed before settlement");
        return Settlement::Discarded;
    }
    shared.borrow_mut().settle(seq, outcome)
}
