use std::rc::Rc;

use bizdesk::application::{ExpenseList, Session, Severity, NO_REPORTS_FOUND, REPORTS_LOAD_FAILED};
use bizdesk::infrastructure::{RequestMethod, ScriptedTransport, TokenStore};
use serde_json::json;

fn setup() -> (Rc<ScriptedTransport>, Session, ExpenseList) {
    let transport = Rc::new(ScriptedTransport::new());
    let session = Session::new(transport.clone(), TokenStore::in_memory());
    let list = ExpenseList::new(&session);
    (transport, session, list)
}

fn script_reports(transport: &ScriptedTransport) {
    transport.on(
        RequestMethod::Get,
        "/expense/",
        200,
        json!({ "data": [
            { "id": "r-1", "title": "Client visit", "status": "Pending",
              "employeeFirstName": "Ana", "employeeLastName": "López" },
            { "id": "r-2", "title": "Conference", "status": "Accepted",
              "employeeFirstName": "Bruno", "employeeLastName": "Díaz" },
            { "id": "r-3", "title": "Taxi", "status": "Payed",
              "employeeFirstName": "Carla", "employeeLastName": "Lozano" }
        ]}),
    );
}

fn ids(list: &ExpenseList) -> Vec<String> {
    list.visible().into_iter().map(|report| report.id).collect()
}

#[tokio::test]
async fn load_lists_every_report_in_server_order() {
    let (transport, session, list) = setup();
    script_reports(&transport);

    let load = list.load();
    assert!(list.is_loading());
    assert!(load.await);

    assert_eq!(ids(&list), ["r-1", "r-2", "r-3"]);
    assert!(list.placeholder().is_none());
    assert!(session.notifications().current().is_none());
}

#[tokio::test]
async fn search_matches_names_ignoring_case_and_accents() {
    let (transport, _, mut list) = setup();
    script_reports(&transport);
    list.load().await;

    list.set_search("LO");
    assert_eq!(ids(&list), ["r-1", "r-3"]);

    list.set_search("diaz");
    assert_eq!(ids(&list), ["r-2"]);

    list.set_search("zoe");
    assert!(list.visible().is_empty());
    assert_eq!(list.placeholder(), Some(NO_REPORTS_FOUND));

    list.set_search("");
    assert_eq!(list.visible().len(), 3);
}

#[tokio::test]
async fn failed_load_shows_danger_notification() {
    let (transport, session, list) = setup();
    transport.on(RequestMethod::Get, "/expense/", 500, json!({ "message": "db down" }));

    assert!(!list.load().await);

    let message = session.notifications().current().unwrap();
    assert_eq!(message.text, REPORTS_LOAD_FAILED);
    assert_eq!(message.severity, Severity::Danger);
    assert!(list.load_error().is_some());
    assert_eq!(list.placeholder(), Some(NO_REPORTS_FOUND));
}
