//! Status transitions for entities that carry a [`StatusValue`].
//!
//! Tasks are updated optimistically: the displayed status flips as soon as
//! the user picks a value. Projects and expense reports wait for the server
//! and put the previous status back when the update fails. A transition
//! dropped before the server answers puts back the status the entity had
//! before its first unanswered transition.

use super::notifications::Severity;
use super::resource::{Call, Endpoint, ResourceRequest, Settlement};
use super::session::Session;
use crate::domain::{EntityKind, RequestError, StatusValue, ValidationError};
use crate::infrastructure::RequestMethod;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Base path; the entity id is appended.
    pub status_path: String,
    pub optimistic: bool,
    pub success_text: String,
    /// Shown when the server gives no message of its own.
    pub failure_text: String,
}

impl WorkflowConfig {
    pub fn for_kind(kind: EntityKind) -> Self {
        let (status_path, optimistic, success_text, failure_text) = match kind {
            EntityKind::Task => (
                "/tasks/update/status",
                true,
                "Task status updated successfully.",
                "Failed to update status task.",
            ),
            EntityKind::Project => (
                "/project/update/status",
                false,
                "Project status updated successfully",
                "Error updating project status. Please, try again",
            ),
            EntityKind::ExpenseReport => (
                "/expense/report/status",
                false,
                "Expense status updated successfully",
                "Error updating expense status. Please, try again",
            ),
        };
        Self {
            status_path: status_path.to_string(),
            optimistic,
            success_text: success_text.to_string(),
            failure_text: failure_text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome<S> {
    /// The server accepted the change; carries the status now displayed.
    Confirmed(S),
    Failed {
        attempted: S,
        displayed: Option<S>,
        error: RequestError,
    },
    /// A newer transition on the same entity was requested meanwhile.
    Superseded,
    /// The view went away before the server answered.
    Discarded,
    Rejected(ValidationError),
}

pub type Transition<S> = LocalBoxFuture<'static, TransitionOutcome<S>>;

/// Drives status changes for one entity kind and remembers the status each
/// tracked entity currently displays.
#[derive(Clone)]
pub struct StatusWorkflow<S: StatusValue> {
    session: Session,
    config: Rc<WorkflowConfig>,
    displayed: Rc<RefCell<HashMap<String, S>>>,
    outstanding: Rc<RefCell<HashMap<String, Outstanding<S>>>>,
    requests: Rc<RefCell<HashMap<String, ResourceRequest<Value>>>>,
}

/// Unanswered transitions on one entity and the status it showed before
/// the first of them, kept current by reloads.
struct Outstanding<S> {
    count: usize,
    baseline: Option<S>,
}

struct TransitionGuard<S: StatusValue> {
    entity_id: String,
    optimistic: bool,
    displayed: Rc<RefCell<HashMap<String, S>>>,
    outstanding: Rc<RefCell<HashMap<String, Outstanding<S>>>>,
    finished: bool,
}

impl<S: StatusValue> TransitionGuard<S> {
    /// Marks the transition answered. `accepted` is a status the server
    /// took even though a newer transition hides it. Returns the baseline.
    fn finish(&mut self, accepted: Option<S>) -> Option<S> {
        self.finished = true;
        let mut outstanding = self.outstanding.borrow_mut();
        let entry = outstanding.get_mut(&self.entity_id)?;
        if accepted.is_some() {
            entry.baseline = accepted;
        }
        let baseline = entry.baseline;
        entry.count -= 1;
        if entry.count == 0 {
            outstanding.remove(&self.entity_id);
        }
        baseline
    }
}

impl<S: StatusValue> Drop for TransitionGuard<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let (Ok(mut outstanding), Ok(mut displayed)) =
            (self.outstanding.try_borrow_mut(), self.displayed.try_borrow_mut())
        else {
            return;
        };
        let Some(entry) = outstanding.get_mut(&self.entity_id) else {
            return;
        };
        entry.count -= 1;
        if entry.count > 0 {
            return;
        }
        let baseline = entry.baseline;
        outstanding.remove(&self.entity_id);
        if self.optimistic {
            match baseline {
                Some(status) => displayed.insert(self.entity_id.clone(), status),
                None => displayed.remove(&self.entity_id),
            };
        }
        tracing::debug!(kind = %S::KIND, entity_id = %self.entity_id, "status change dropped before an answer");
    }
}

impl<S: StatusValue> StatusWorkflow<S> {
    pub fn new(session: &Session) -> Self {
        Self::with_config(session, WorkflowConfig::for_kind(S::KIND))
    }

    pub fn with_config(session: &Session, config: WorkflowConfig) -> Self {
        Self {
            session: session.clone(),
            config: Rc::new(config),
            displayed: Rc::new(RefCell::new(HashMap::new())),
            outstanding: Rc::new(RefCell::new(HashMap::new())),
            requests: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn is_optimistic(&self) -> bool {
        self.config.optimistic
    }

    /// Records the status an entity was loaded with.
    pub fn track(&self, entity_id: impl Into<String>, status: S) {
        self.displayed.borrow_mut().insert(entity_id.into(), status);
    }

    /// Replaces all tracked statuses, typically after a reload. An entity
    /// with an unanswered optimistic transition keeps showing the requested
    /// value; the reloaded one becomes what a failure falls back to.
    pub fn track_all(&self, entries: impl IntoIterator<Item = (String, S)>) {
        let mut outstanding = self.outstanding.borrow_mut();
        let mut displayed = self.displayed.borrow_mut();
        let kept: Vec<(String, S)> = displayed
            .drain()
            .filter(|(entity_id, _)| self.config.optimistic && outstanding.contains_key(entity_id))
            .collect();
        for (entity_id, status) in entries {
            match outstanding.get_mut(&entity_id) {
                Some(entry) => {
                    entry.baseline = Some(status);
                    if !self.config.optimistic {
                        displayed.insert(entity_id, status);
                    }
                }
                None => {
                    displayed.insert(entity_id, status);
                }
            }
        }
        displayed.extend(kept);
    }

    pub fn displayed(&self, entity_id: &str) -> Option<S> {
        self.displayed.borrow().get(entity_id).copied()
    }

    pub fn is_updating(&self, entity_id: &str) -> bool {
        self.requests
            .borrow()
            .get(entity_id)
            .is_some_and(|request| request.is_pending())
    }

    /// Parses `raw` first; unknown values are rejected without a call.
    pub fn request_transition_str(&self, entity_id: &str, raw: &str) -> Transition<S> {
        match S::parse(raw) {
            Ok(status) => self.request_transition(entity_id, status),
            Err(error) => {
                tracing::warn!(kind = %S::KIND, entity_id, %error, "status change rejected");
                future::ready(TransitionOutcome::Rejected(error)).boxed_local()
            }
        }
    }

    /// Sends the new status. Under the optimistic policy the displayed
    /// status has already changed when this returns.
    pub fn request_transition(&self, entity_id: &str, new_status: S) -> Transition<S> {
        let dispatch = {
            let mut requests = self.requests.borrow_mut();
            let request = requests.entry(entity_id.to_string()).or_insert_with(|| {
                ResourceRequest::new(
                    &self.session,
                    Endpoint::per_entity(RequestMethod::Put, self.config.status_path.as_str()),
                )
            });
            request.trigger(
                Call::new()
                    .identifier(entity_id)
                    .json_body(json!({ "status": new_status.as_str() })),
            )
        };
        if let Some(error) = dispatch.rejected().cloned() {
            return future::ready(TransitionOutcome::Rejected(error)).boxed_local();
        }

        let previous = self.displayed(entity_id);
        self.outstanding
            .borrow_mut()
            .entry(entity_id.to_string())
            .or_insert(Outstanding {
                count: 0,
                baseline: previous,
            })
            .count += 1;
        if self.config.optimistic {
            self.track(entity_id, new_status);
        }
        tracing::info!(
            kind = %S::KIND,
            entity_id,
            from = ?previous,
            to = ?new_status,
            optimistic = self.config.optimistic,
            "status change requested"
        );

        let entity_id = entity_id.to_string();
        let session = self.session.clone();
        let config = Rc::clone(&self.config);
        let displayed = Rc::clone(&self.displayed);
        let mut guard = TransitionGuard {
            entity_id: entity_id.clone(),
            optimistic: self.config.optimistic,
            displayed: Rc::clone(&self.displayed),
            outstanding: Rc::clone(&self.outstanding),
            finished: false,
        };
        async move {
            let settlement = dispatch.settle().await;
            let accepted = match &settlement {
                Settlement::Superseded(Some(body)) => Some(echoed_status::<S>(body).unwrap_or(new_status)),
                _ => None,
            };
            let baseline = guard.finish(accepted);
            match settlement {
                Settlement::Succeeded(body) => {
                    let confirmed = echoed_status::<S>(&body).unwrap_or(new_status);
                    displayed.borrow_mut().insert(entity_id, confirmed);
                    session.notify(config.success_text.as_str(), Severity::Success);
                    TransitionOutcome::Confirmed(confirmed)
                }
                Settlement::Failed(error) => {
                    let mut displayed = displayed.borrow_mut();
                    if !config.optimistic {
                        match baseline.or(previous) {
                            Some(status) => displayed.insert(entity_id.clone(), status),
                            None => displayed.remove(&entity_id),
                        };
                    }
                    session.notify(error.user_message_or(&config.failure_text), Severity::Danger);
                    TransitionOutcome::Failed {
                        attempted: new_status,
                        displayed: displayed.get(&entity_id).copied(),
                        error,
                    }
                }
                Settlement::Superseded(_) => TransitionOutcome::Superseded,
                Settlement::Discarded => TransitionOutcome::Discarded,
                Settlement::Rejected(error) => TransitionOutcome::Rejected(error),
            }
        }
        .boxed_local()
    }
}

/// Status echoed back in the response payload, when there is a valid one.
fn echoed_status<S: StatusValue>(body: &Value) -> Option<S> {
    body.get("status")
        .and_then(Value::as_str)
        .and_then(|raw| S::parse(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpenseReportStatus, ProjectStatus, TaskStatus};
    use crate::infrastructure::{ScriptedTransport, TokenStore};

    fn setup() -> (Rc<ScriptedTransport>, Session) {
        let transport = Rc::new(ScriptedTransport::new());
        let session = Session::new(transport.clone(), TokenStore::in_memory());
        (transport, session)
    }

    #[test]
    fn test_policy_per_kind() {
        assert!(WorkflowConfig::for_kind(EntityKind::Task).optimistic);
        assert!(!WorkflowConfig::for_kind(EntityKind::Project).optimistic);
        assert!(!WorkflowConfig::for_kind(EntityKind::ExpenseReport).optimistic);
    }

    #[tokio::test]
    async fn test_task_failure_notifies_danger_and_keeps_optimistic_value() {
        let (transport, session) = setup();
        transport.reply_json(500, json!({}));
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);
        workflow.track("t1", TaskStatus::NotStarted);

        let transition = workflow.request_transition("t1", TaskStatus::Done);
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::Done));
        let outcome = transition.await;

        assert!(matches!(outcome, TransitionOutcome::Failed { .. }));
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::Done));
        let message = session.notifications().current().unwrap();
        assert_eq!(message.severity, Severity::Danger);
        assert_eq!(message.text, "Failed to update status task.");
    }

    #[tokio::test]
    async fn test_request_shape() {
        let (transport, session) = setup();
        transport.reply_json(200, json!({ "data": null }));
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        workflow.request_transition("t9", TaskStatus::InProgress).await;

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, RequestMethod::Put);
        assert_eq!(sent.path, "/tasks/update/status/t9");
        assert_eq!(sent.body, Some(json!({ "status": "In progress" })));
        assert_eq!(sent.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_project_status_changes_only_after_success() {
        let (transport, session) = setup();
        let reply = transport.hold();
        let workflow: StatusWorkflow<ProjectStatus> = StatusWorkflow::new(&session);
        workflow.track("p1", ProjectStatus::InQuotation);

        let transition = workflow.request_transition("p1", ProjectStatus::Accepted);
        assert_eq!(workflow.displayed("p1"), Some(ProjectStatus::InQuotation));
        assert!(workflow.is_updating("p1"));

        reply.release_json(200, json!({ "data": { "id": "p1" } }));
        let outcome = transition.await;

        assert_eq!(outcome, TransitionOutcome::Confirmed(ProjectStatus::Accepted));
        assert_eq!(workflow.displayed("p1"), Some(ProjectStatus::Accepted));
        assert_eq!(session.notifications().current().unwrap().severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_confirmed_failure_restores_previous_and_surfaces_server_message() {
        let (transport, session) = setup();
        transport.reply_json(409, json!({ "message": "Report already paid" }));
        let workflow: StatusWorkflow<ExpenseReportStatus> = StatusWorkflow::new(&session);
        workflow.track("r1", ExpenseReportStatus::Pending);

        let outcome = workflow.request_transition("r1", ExpenseReportStatus::Rejected).await;

        match outcome {
            TransitionOutcome::Failed { attempted, displayed, .. } => {
                assert_eq!(attempted, ExpenseReportStatus::Rejected);
                assert_eq!(displayed, Some(ExpenseReportStatus::Pending));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(workflow.displayed("r1"), Some(ExpenseReportStatus::Pending));
        assert_eq!(session.notifications().current().unwrap().text, "Report already paid");
    }

    #[tokio::test]
    async fn test_server_echo_wins_over_requested_value() {
        let (transport, session) = setup();
        transport.reply_json(200, json!({ "data": { "status": "Payed" } }));
        let workflow: StatusWorkflow<ExpenseReportStatus> = StatusWorkflow::new(&session);

        let outcome = workflow.request_transition("r1", ExpenseReportStatus::Accepted).await;

        assert_eq!(outcome, TransitionOutcome::Confirmed(ExpenseReportStatus::Payed));
        assert_eq!(workflow.displayed("r1"), Some(ExpenseReportStatus::Payed));
    }

    #[tokio::test]
    async fn test_unknown_status_string_is_rejected_locally() {
        let (transport, session) = setup();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        let outcome = workflow.request_transition_str("t1", "Finished-ish").await;

        assert!(matches!(outcome, TransitionOutcome::Rejected(ValidationError::UnknownStatus { .. })));
        assert_eq!(transport.request_count(), 0);
        assert!(session.notifications().current().is_none());
    }

    #[tokio::test]
    async fn test_status_string_accepts_screaming_case() {
        let (transport, session) = setup();
        transport.reply_json(200, json!({}));
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        let outcome = workflow.request_transition_str("t1", "UNDER_REVISION").await;

        assert_eq!(outcome, TransitionOutcome::Confirmed(TaskStatus::UnderRevision));
    }

    #[tokio::test]
    async fn test_blank_entity_id_is_rejected() {
        let (transport, session) = setup();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        let outcome = workflow.request_transition(" ", TaskStatus::Done).await;

        assert!(matches!(outcome, TransitionOutcome::Rejected(ValidationError::BlankIdentifier { .. })));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(workflow.displayed(" "), None);
    }

    #[tokio::test]
    async fn test_superseded_transition_stays_silent() {
        let (transport, session) = setup();
        let first_reply = transport.hold();
        let second_reply = transport.hold();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        let first = workflow.request_transition("t1", TaskStatus::InProgress);
        let second = workflow.request_transition("t1", TaskStatus::Done);
        first_reply.release_json(500, json!({ "message": "stale failure" }));
        second_reply.release_json(200, json!({}));

        let (first, second) = futures::join!(first, second);

        assert_eq!(first, TransitionOutcome::Superseded);
        assert_eq!(second, TransitionOutcome::Confirmed(TaskStatus::Done));
        let message = session.notifications().current().unwrap();
        assert_eq!(message.severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_different_entities_do_not_supersede_each_other() {
        let (transport, session) = setup();
        transport.reply_json(200, json!({}));
        transport.reply_json(200, json!({}));
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);

        let a = workflow.request_transition("a", TaskStatus::Done);
        let b = workflow.request_transition("b", TaskStatus::Delayed);
        let (a, b) = futures::join!(a, b);

        assert_eq!(a, TransitionOutcome::Confirmed(TaskStatus::Done));
        assert_eq!(b, TransitionOutcome::Confirmed(TaskStatus::Delayed));
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let (transport, session) = setup();
        transport.reply_json(500, json!({}));
        transport.reply_json(200, json!({}));
        let workflow: StatusWorkflow<ProjectStatus> = StatusWorkflow::new(&session);
        workflow.track("p1", ProjectStatus::Default);

        let first = workflow.request_transition("p1", ProjectStatus::Done).await;
        let second = workflow.request_transition("p1", ProjectStatus::Done).await;

        assert!(matches!(first, TransitionOutcome::Failed { .. }));
        assert_eq!(second, TransitionOutcome::Confirmed(ProjectStatus::Done));
    }

    #[tokio::test]
    async fn test_dropped_transition_puts_status_back() {
        let (transport, session) = setup();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);
        workflow.track("t1", TaskStatus::InProgress);

        drop(workflow.request_transition("t1", TaskStatus::Done));
        tokio::task::yield_now().await;

        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::InProgress));
        assert!(!workflow.is_updating("t1"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_both_transitions_returns_to_first_baseline() {
        let (_, session) = setup();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);
        workflow.track("t1", TaskStatus::NotStarted);

        let first = workflow.request_transition("t1", TaskStatus::Delayed);
        let second = workflow.request_transition("t1", TaskStatus::Done);
        drop(second);
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::Done));
        drop(first);

        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::NotStarted));
        assert!(!workflow.is_updating("t1"));
    }

    #[tokio::test]
    async fn test_reload_during_transition_keeps_requested_value() {
        let (transport, session) = setup();
        let reply = transport.hold();
        let workflow: StatusWorkflow<TaskStatus> = StatusWorkflow::new(&session);
        workflow.track("t1", TaskStatus::NotStarted);

        let transition = workflow.request_transition("t1", TaskStatus::Done);
        workflow.track_all([
            ("t1".to_string(), TaskStatus::InProgress),
            ("t2".to_string(), TaskStatus::Delayed),
        ]);
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::Done));
        assert_eq!(workflow.displayed("t2"), Some(TaskStatus::Delayed));

        reply.release_json(500, json!({}));
        assert!(matches!(transition.await, TransitionOutcome::Failed { .. }));
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::Done));

        workflow.track_all([("t1".to_string(), TaskStatus::InProgress)]);
        assert_eq!(workflow.displayed("t1"), Some(TaskStatus::InProgress));
    }

    #[tokio::test]
    async fn test_confirmed_failure_falls_back_to_reloaded_status() {
        let (transport, session) = setup();
        let reply = transport.hold();
        let workflow: StatusWorkflow<ProjectStatus> = StatusWorkflow::new(&session);
        workflow.track("p1", ProjectStatus::Default);

        let transition = workflow.request_transition("p1", ProjectStatus::Done);
        workflow.track_all([("p1".to_string(), ProjectStatus::InProgress)]);
        assert_eq!(workflow.displayed("p1"), Some(ProjectStatus::InProgress));
        reply.release_json(500, json!({}));

        assert!(matches!(transition.await, TransitionOutcome::Failed { .. }));
        assert_eq!(workflow.displayed("p1"), Some(ProjectStatus::InProgress));
    }
}
