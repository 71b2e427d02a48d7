use std::rc::Rc;

use bizdesk::application::{
    AccessProblem, ExpenseDetail, Session, Severity, TransitionOutcome, REPORT_DELETED, VOUCHER_MISSING,
    VOUCHER_UPLOADED,
};
use bizdesk::domain::{EmployeeRole, ExpenseReportStatus};
use bizdesk::infrastructure::{RequestMethod, ScriptedTransport, TokenStore};
use serde_json::json;

fn setup() -> (Rc<ScriptedTransport>, Session, ExpenseDetail) {
    let transport = Rc::new(ScriptedTransport::new());
    let session = Session::new(transport.clone(), TokenStore::in_memory());
    let detail = ExpenseDetail::new(&session, "r-1");
    (transport, session, detail)
}

fn script_report(transport: &ScriptedTransport, voucher: Option<&str>) {
    transport.on(
        RequestMethod::Get,
        "/expense/report/r-1",
        200,
        json!({ "data": {
            "id": "r-1",
            "title": "Client visit",
            "status": "Pending",
            "totalAmount": 120.5,
            "urlVoucher": voucher,
            "employeeFirstName": "Ana Maria",
            "employeeLastName": "Lopez Garcia",
            "expenses": [ { "id": "e-1", "title": "Taxi", "totalAmount": 20.5 } ]
        }}),
    );
}

#[tokio::test]
async fn load_exposes_report_and_status() {
    let (transport, session, detail) = setup();
    script_report(&transport, None);

    let report = detail.load().await.unwrap();

    assert_eq!(report.expenses.len(), 1);
    assert_eq!(detail.displayed_status(), Some(ExpenseReportStatus::Pending));
    assert_eq!(detail.employee_name().as_deref(), Some("Ana Lopez"));
    assert!(session.notifications().current().is_none());
}

#[tokio::test]
async fn status_edit_depends_on_role_and_voucher() {
    let (transport, _, detail) = setup();
    script_report(&transport, None);
    detail.load().await;

    assert!(detail.can_edit_status(EmployeeRole::Admin));
    assert!(detail.can_edit_status(EmployeeRole::Accounting));
    assert!(!detail.can_edit_status(EmployeeRole::Legal));
    assert!(!detail.can_edit_status(EmployeeRole::WithoutRole));

    let (transport, _, paid) = setup();
    script_report(&transport, Some("https://files.example.com/v.pdf"));
    paid.load().await;
    assert!(!paid.can_edit_status(EmployeeRole::Admin));
}

#[tokio::test]
async fn status_change_waits_for_confirmation() {
    let (transport, session, detail) = setup();
    script_report(&transport, None);
    detail.load().await;
    let reply = transport.hold();

    let transition = detail.change_status(ExpenseReportStatus::Accepted);
    assert_eq!(detail.displayed_status(), Some(ExpenseReportStatus::Pending));
    reply.release_json(200, json!({ "data": {} }));

    assert_eq!(transition.await, TransitionOutcome::Confirmed(ExpenseReportStatus::Accepted));
    assert_eq!(detail.displayed_status(), Some(ExpenseReportStatus::Accepted));
    assert_eq!(session.notifications().current().unwrap().severity, Severity::Success);
    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.path, "/expense/report/status/r-1");
}

#[tokio::test]
async fn failed_status_change_restores_previous_value() {
    let (transport, session, detail) = setup();
    script_report(&transport, None);
    detail.load().await;
    transport.on(RequestMethod::Put, "/expense/report/status/r-1", 500, json!({}));

    let outcome = detail.change_status(ExpenseReportStatus::Rejected).await;

    assert!(matches!(outcome, TransitionOutcome::Failed { .. }));
    assert_eq!(detail.displayed_status(), Some(ExpenseReportStatus::Pending));
    let message = session.notifications().current().unwrap();
    assert_eq!(message.text, "Error updating expense status. Please, try again");
    assert_eq!(message.severity, Severity::Danger);
}

#[tokio::test]
async fn voucher_upload_marks_report_paid() {
    let (transport, session, detail) = setup();
    script_report(&transport, None);
    detail.load().await;
    transport.on(RequestMethod::Put, "/expense/report/r-1", 200, json!({ "data": null }));

    assert!(detail.attach_voucher(" https://files.example.com/v.pdf ").await);

    let report = detail.report().unwrap();
    assert_eq!(report.url_voucher.as_deref(), Some("https://files.example.com/v.pdf"));
    assert_eq!(detail.displayed_status(), Some(ExpenseReportStatus::Payed));
    assert!(!detail.can_edit_status(EmployeeRole::Admin));
    assert_eq!(session.notifications().current().unwrap().text, VOUCHER_UPLOADED);
    let sent = transport.requests().pop().unwrap();
    assert_eq!(
        sent.body,
        Some(json!({ "urlVoucher": "https://files.example.com/v.pdf", "status": "Payed" }))
    );
}

#[tokio::test]
async fn blank_voucher_is_a_warning_without_a_call() {
    let (transport, session, detail) = setup();

    assert!(!detail.attach_voucher("   ").await);

    assert_eq!(transport.request_count(), 0);
    let message = session.notifications().current().unwrap();
    assert_eq!(message.text, VOUCHER_MISSING);
    assert_eq!(message.severity, Severity::Warning);
}

#[tokio::test]
async fn delete_notifies_success() {
    let (transport, session, detail) = setup();
    transport.on(RequestMethod::Delete, "/expense/report/delete/r-1", 200, json!({}));

    assert!(detail.delete().await);

    assert_eq!(session.notifications().current().unwrap().text, REPORT_DELETED);
}

#[tokio::test]
async fn unauthorized_read_is_an_access_problem_not_a_toast() {
    let (transport, session, detail) = setup();
    transport.on(
        RequestMethod::Get,
        "/expense/report/r-1",
        400,
        json!({ "message": "Unauthorized employee" }),
    );

    assert!(detail.load().await.is_none());

    assert_eq!(detail.access_problem(), Some(AccessProblem::NotAuthorized));
    assert!(session.notifications().current().is_none());
}

#[tokio::test]
async fn blank_report_id_is_never_requested() {
    let transport = Rc::new(ScriptedTransport::new());
    let session = Session::new(transport.clone(), TokenStore::in_memory());
    let detail = ExpenseDetail::new(&session, "null");

    assert!(detail.load().await.is_none());
    assert!(!detail.delete().await);

    assert_eq!(transport.request_count(), 0);
    assert!(!detail.is_loading());
}
