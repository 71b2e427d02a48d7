use super::notifications::Severity;
use super::resource::{Call, Endpoint, ResourceRequest, Settlement};
use super::session::Session;
use super::workflow::{StatusWorkflow, Transition};
use crate::domain::{
    filter_expenses_by_employee, short_employee_name, EmployeeRole, ExpenseReport, ExpenseReportStatus,
    RequestError, StatusValue,
};
use crate::infrastructure::RequestMethod;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{json, Value};

pub const REPORT_LOAD_FAILED: &str = "An error occurred while fetching the expense report";
pub const REPORT_DELETED: &str = "Expense deleted successfully";
pub const REPORT_DELETE_FAILED: &str = "Error deleting expense. Please, try again";
pub const VOUCHER_UPLOADED: &str = "Voucher uploaded successfully";
pub const VOUCHER_UPLOAD_FAILED: &str = "Error uploading voucher. Please, try again";
pub const VOUCHER_MISSING: &str = "Please, enter a voucher link";
pub const REPORTS_LOAD_FAILED: &str = "An error occurred while fetching the expense reports";
pub const NO_REPORTS_FOUND: &str = "No expense reports were found";

/// Why a report could not be shown at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessProblem {
    NotFound,
    NotAuthorized,
}

impl AccessProblem {
    /// Classifies a failed read by status code, falling back to the server's
    /// wording.
    pub fn from_error(error: &RequestError) -> Option<Self> {
        match error.status_code() {
            Some(404) => return Some(AccessProblem::NotFound),
            Some(401 | 403) => return Some(AccessProblem::NotAuthorized),
            _ => {}
        }
        let message = error.server_message()?.to_lowercase();
        if message.contains("unauthorized employee") {
            Some(AccessProblem::NotAuthorized)
        } else if message.contains("unexpected error") || message.contains("not found") {
            Some(AccessProblem::NotFound)
        } else {
            None
        }
    }
}

/// One expense report with its status, deletion and voucher upload.
pub struct ExpenseDetail {
    session: Session,
    report_id: String,
    report: ResourceRequest<ExpenseReport>,
    deletion: ResourceRequest<Value>,
    voucher: ResourceRequest<Value>,
    workflow: StatusWorkflow<ExpenseReportStatus>,
}

impl ExpenseDetail {
    pub fn new(session: &Session, report_id: &str) -> Self {
        Self {
            session: session.clone(),
            report_id: report_id.to_string(),
            report: ResourceRequest::new(
                session,
                Endpoint::entity(RequestMethod::Get, "/expense/report", report_id),
            ),
            deletion: ResourceRequest::new(
                session,
                Endpoint::entity(RequestMethod::Delete, "/expense/report/delete", report_id),
            ),
            voucher: ResourceRequest::new(
                session,
                Endpoint::entity(RequestMethod::Put, "/expense/report", report_id),
            ),
            workflow: StatusWorkflow::new(session),
        }
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn load(&self) -> LocalBoxFuture<'static, Option<ExpenseReport>> {
        let dispatch = self.report.trigger(Call::new());
        let session = self.session.clone();
        let workflow = self.workflow.clone();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(report) => {
                    workflow.track(report.id.clone(), report.status);
                    Some(report)
                }
                Settlement::Failed(error) => {
                    if AccessProblem::from_error(&error).is_none() {
                        session.notify(error.user_message_or(REPORT_LOAD_FAILED), Severity::Danger);
                    }
                    None
                }
                _ => None,
            }
        }
        .boxed_local()
    }

    pub fn is_loading(&self) -> bool {
        self.report.is_pending()
    }

    pub fn report(&self) -> Option<ExpenseReport> {
        self.report.data()
    }

    pub fn access_problem(&self) -> Option<AccessProblem> {
        self.report.error().as_ref().and_then(AccessProblem::from_error)
    }

    /// Status shown for the report, including confirmed transitions.
    pub fn displayed_status(&self) -> Option<ExpenseReportStatus> {
        self.workflow
            .displayed(&self.report_id)
            .or_else(|| self.report.state().data().map(|report| report.status))
    }

    pub fn employee_name(&self) -> Option<String> {
        let state = self.report.state();
        let report = state.data()?;
        short_employee_name(report.employee_first_name.as_deref(), report.employee_last_name.as_deref())
    }

    /// Only Admin and Accounting may change the status, and only until a
    /// voucher has been attached.
    pub fn can_edit_status(&self, role: EmployeeRole) -> bool {
        let has_voucher = self
            .report
            .state()
            .data()
            .is_some_and(ExpenseReport::has_voucher);
        role.manages_expenses() && !has_voucher
    }

    pub fn change_status(&self, status: ExpenseReportStatus) -> Transition<ExpenseReportStatus> {
        self.workflow.request_transition(&self.report_id, status)
    }

    pub fn delete(&self) -> LocalBoxFuture<'static, bool> {
        let dispatch = self.deletion.trigger(Call::new());
        if dispatch.rejected().is_some() {
            return future::ready(false).boxed_local();
        }
        let session = self.session.clone();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(_) => {
                    session.notify(REPORT_DELETED, Severity::Success);
                    true
                }
                Settlement::Failed(error) => {
                    session.notify(error.user_message_or(REPORT_DELETE_FAILED), Severity::Danger);
                    false
                }
                _ => false,
            }
        }
        .boxed_local()
    }

    /// Attaches a payment voucher link. On success the report is marked
    /// `PAYED` locally.
    pub fn attach_voucher(&self, url: &str) -> LocalBoxFuture<'static, bool> {
        let url = url.trim().to_string();
        if url.is_empty() {
            self.session.notify(VOUCHER_MISSING, Severity::Warning);
            return future::ready(false).boxed_local();
        }

        let dispatch = self.voucher.trigger(Call::new().json_body(json!({
            "urlVoucher": url,
            "status": ExpenseReportStatus::Payed.as_str(),
        })));
        if dispatch.rejected().is_some() {
            return future::ready(false).boxed_local();
        }
        let session = self.session.clone();
        let report = self.report.handle();
        let workflow = self.workflow.clone();
        let report_id = self.report_id.clone();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(_) => {
                    report.modify_data(|report| {
                        report.url_voucher = Some(url);
                        report.status = ExpenseReportStatus::Payed;
                    });
                    workflow.track(report_id, ExpenseReportStatus::Payed);
                    session.notify(VOUCHER_UPLOADED, Severity::Success);
                    true
                }
                Settlement::Failed(error) => {
                    session.notify(error.user_message_or(VOUCHER_UPLOAD_FAILED), Severity::Danger);
                    false
                }
                _ => false,
            }
        }
        .boxed_local()
    }
}

/// All expense reports, narrowed by an employee-name search.
pub struct ExpenseList {
    session: Session,
    reports: ResourceRequest<Vec<ExpenseReport>>,
    search: String,
}

impl ExpenseList {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            reports: ResourceRequest::new(session, Endpoint::new(RequestMethod::Get, "/expense/")),
            search: String::new(),
        }
    }

    pub fn load(&self) -> LocalBoxFuture<'static, bool> {
        let dispatch = self.reports.trigger(Call::new());
        let session = self.session.clone();
        async move {
            match dispatch.settle().await {
                Settlement::Succeeded(reports) => {
                    tracing::debug!(count = reports.len(), "expense reports loaded");
                    true
                }
                Settlement::Failed(_) => {
                    session.notify(REPORTS_LOAD_FAILED, Severity::Danger);
                    false
                }
                _ => false,
            }
        }
        .boxed_local()
    }

    pub fn is_loading(&self) -> bool {
        self.reports.is_pending()
    }

    pub fn load_error(&self) -> Option<RequestError> {
        self.reports.error()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Reports matching the current search, in server order.
    pub fn visible(&self) -> Vec<ExpenseReport> {
        let state = self.reports.state();
        let reports = state.data().map(Vec::as_slice).unwrap_or_default();
        filter_expenses_by_employee(reports, &self.search)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Text shown in place of the list when nothing matches.
    pub fn placeholder(&self) -> Option<&'static str> {
        (!self.is_loading() && self.visible().is_empty()).then_some(NO_REPORTS_FOUND)
    }
}
