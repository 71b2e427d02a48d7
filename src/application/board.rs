use super::notifications::Severity;
use super::resource::{Call, Dispatch, Endpoint, RequestHandle, ResourceRequest, Settlement};
use super::session::Session;
use super::workflow::{StatusWorkflow, Transition};
use crate::domain::{group_tasks_by_project, Project, ProjectGroup, RequestError, Task, TaskDraft, TaskStatus};
use crate::infrastructure::RequestMethod;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;

pub const TASKS_LOAD_FAILED: &str = "An error occurred while fetching the tasks";
pub const TASK_DELETED: &str = "Task deleted successfully";
pub const TASK_DELETE_FAILED: &str = "An error occurred while deleting the task";
pub const TASK_CREATED: &str = "Task created successfully.";
pub const TASK_CREATE_FAILED: &str = "Failed to create task.";
pub const TASK_UPDATED: &str = "Task updated successfully.";
pub const TASK_UPDATE_FAILED: &str = "Failed to update task.";

/// The employee's tasks grouped by project, with status changes, creation,
/// editing and deletion.
pub struct TaskBoard {
    session: Session,
    tasks: ResourceRequest<Vec<Task>>,
    projects: ResourceRequest<Vec<Project>>,
    creation: ResourceRequest<Value>,
    update: ResourceRequest<Value>,
    deletion: ResourceRequest<Value>,
    workflow: StatusWorkflow<TaskStatus>,
}

impl TaskBoard {
    /// A board for `employee_id`. Without an employee the task read is
    /// rejected locally and the board stays empty.
    pub fn new(session: &Session, employee_id: Option<&str>) -> Self {
        Self {
            session: session.clone(),
            tasks: ResourceRequest::new(
                session,
                Endpoint::entity(RequestMethod::Get, "/tasks/employee", employee_id.unwrap_or_default()),
            ),
            projects: ResourceRequest::new(session, Endpoint::new(RequestMethod::Get, "/project/")),
            creation: ResourceRequest::new(session, Endpoint::new(RequestMethod::Post, "/tasks/create")),
            update: ResourceRequest::new(session, Endpoint::per_entity(RequestMethod::Put, "/tasks/update")),
            deletion: ResourceRequest::new(session, Endpoint::per_entity(RequestMethod::Delete, "/tasks/delete")),
            workflow: StatusWorkflow::new(session),
        }
    }

    /// Fetches tasks and projects together. Resolves to whether both reads
    /// succeeded; a failure shows one danger notification.
    pub fn load(&self) -> LocalBoxFuture<'static, bool> {
        let tasks = self.tasks.trigger(Call::new());
        let projects = self.projects.trigger(Call::new());
        let session = self.session.clone();
        let workflow = self.workflow.clone();

        async move {
            let (tasks, projects) = futures::join!(tasks.settle(), projects.settle());
            let failed = tasks.is_failed() || projects.is_failed();
            if failed {
                session.notify(TASKS_LOAD_FAILED, Severity::Danger);
            }
            if let Settlement::Succeeded(tasks) = &tasks {
                workflow.track_all(tasks.iter().map(|task| (task.id.clone(), task.status)));
            }
            tracing::debug!(
                tasks_loaded = tasks.is_succeeded(),
                projects_loaded = projects.is_succeeded(),
                "task board load settled"
            );
            !failed && tasks.is_succeeded() && projects.is_succeeded()
        }
        .boxed_local()
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.is_pending() || self.projects.is_pending()
    }

    /// Error from whichever read failed last, if any.
    pub fn load_error(&self) -> Option<RequestError> {
        self.tasks.error().or_else(|| self.projects.error())
    }

    /// Grouped tasks, showing the status each task currently displays.
    pub fn groups(&self) -> Vec<ProjectGroup> {
        let tasks: Vec<Task> = self
            .tasks
            .state()
            .data()
            .map(|tasks| {
                tasks
                    .iter()
                    .map(|task| {
                        let mut task = task.clone();
                        if let Some(status) = self.workflow.displayed(&task.id) {
                            task.status = status;
                        }
                        task
                    })
                    .collect()
            })
            .unwrap_or_default();
        let projects = self.projects.state();
        group_tasks_by_project(&tasks, projects.data().map(Vec::as_slice).unwrap_or_default())
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.groups()
            .into_iter()
            .flat_map(|group| group.tasks)
            .find(|task| task.id == task_id)
    }

    pub fn is_updating(&self, task_id: &str) -> bool {
        self.workflow.is_updating(task_id)
    }

    pub fn change_status(&self, task_id: &str, status: TaskStatus) -> Transition<TaskStatus> {
        self.workflow.request_transition(task_id, status)
    }

    /// Deletes a task. On success the row is dropped locally and tasks are
    /// fetched again.
    pub fn delete_task(&self, task_id: &str) -> LocalBoxFuture<'static, bool> {
        let dispatch = self.deletion.trigger(Call::new().identifier(task_id));
        if dispatch.rejected().is_some() {
            return future::ready(false).boxed_local();
        }

        let session = self.session.clone();
        let tasks = self.tasks.handle();
        let workflow = self.workflow.clone();
        let task_id = task_id.to_string();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(_) => {
                    tasks.modify_data(|tasks| tasks.retain(|task| task.id != task_id));
                    session.notify(TASK_DELETED, Severity::Success);
                    tracing::info!(%task_id, "task deleted");
                    reload_tasks(&tasks, &workflow).await;
                    true
                }
                Settlement::Failed(error) => {
                    session.notify(error.user_message_or(TASK_DELETE_FAILED), Severity::Danger);
                    false
                }
                _ => false,
            }
        }
        .boxed_local()
    }

    /// Creates a task. An invalid draft is reported as a warning and never
    /// sent; a created task shows up through a reload.
    pub fn create_task(&self, draft: &TaskDraft) -> LocalBoxFuture<'static, bool> {
        let Some(body) = self.draft_body(draft) else {
            return future::ready(false).boxed_local();
        };
        let dispatch = self.creation.trigger(Call::new().json_body(body));
        self.save(dispatch, TASK_CREATED, TASK_CREATE_FAILED)
    }

    /// Replaces the editable fields of an existing task.
    pub fn update_task(&self, task_id: &str, draft: &TaskDraft) -> LocalBoxFuture<'static, bool> {
        let Some(body) = self.draft_body(draft) else {
            return future::ready(false).boxed_local();
        };
        let dispatch = self.update.trigger(Call::new().identifier(task_id).json_body(body));
        if dispatch.rejected().is_some() {
            return future::ready(false).boxed_local();
        }
        self.save(dispatch, TASK_UPDATED, TASK_UPDATE_FAILED)
    }

    fn draft_body(&self, draft: &TaskDraft) -> Option<Value> {
        if let Err(error) = draft.validate() {
            tracing::warn!(%error, "task draft not sent");
            self.session.notify(error.to_string(), Severity::Warning);
            return None;
        }
        match serde_json::to_value(draft) {
            Ok(body) => Some(body),
            Err(error) => {
                tracing::warn!(%error, "task draft could not be encoded");
                None
            }
        }
    }

    fn save(
        &self,
        dispatch: Dispatch<Value>,
        success_text: &'static str,
        failure_text: &'static str,
    ) -> LocalBoxFuture<'static, bool> {
        let session = self.session.clone();
        let tasks = self.tasks.handle();
        let workflow = self.workflow.clone();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(_) => {
                    session.notify(success_text, Severity::Success);
                    reload_tasks(&tasks, &workflow).await;
                    true
                }
                Settlement::Failed(error) => {
                    session.notify(error.user_message_or(failure_text), Severity::Danger);
                    false
                }
                _ => false,
            }
        }
        .boxed_local()
    }
}

async fn reload_tasks(tasks: &RequestHandle<Vec<Task>>, workflow: &StatusWorkflow<TaskStatus>) {
    if let Settlement::Succeeded(tasks) = tasks.trigger(Call::new()).settle().await {
        workflow.track_all(tasks.iter().map(|task| (task.id.clone(), task.status)));
    }
}
