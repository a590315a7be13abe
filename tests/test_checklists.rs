mod common;

use common::TestEnvironment;
use mcp_trello::ErrorKind;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_create_checklist() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .and(path("/checklists"))
        .and(body_json(json!({"idCard": "C1", "name": "Launch"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "CL1",
            "name": "Launch",
            "idCard": "C1",
            "checkItems": []
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let checklist = env.client.create_checklist("C1", "Launch").await.unwrap();

    assert_eq!(checklist.id, "CL1");
    assert_eq!(checklist.name, "Launch");
    assert_eq!(checklist.card_id.as_deref(), Some("C1"));
    assert!(checklist.items.is_empty());
}

#[tokio::test]
async fn test_add_checklist_item() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .and(path("/checklists/CL1/checkItems"))
        .and(body_json(json!({"name": "Write docs", "checked": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "I1",
            "name": "Write docs",
            "state": "complete",
            "idChecklist": "CL1",
            "pos": 16384
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let item = env
        .client
        .add_checklist_item("CL1", "Write docs", true)
        .await
        .unwrap();

    assert_eq!(item.id, "I1");
    assert_eq!(item.name, "Write docs");
    assert!(item.checked);
}

#[tokio::test]
async fn test_create_checklist_with_items_keeps_order() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .and(path("/checklists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "CL1", "name": "Launch", "checkItems": []
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    for (id, name) in [("I1", "first"), ("I2", "second")] {
        Mock::given(method("POST"))
            .and(path("/checklists/CL1/checkItems"))
            .and(body_json(json!({"name": name, "checked": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id, "name": name, "state": "incomplete"
            })))
            .expect(1)
            .mount(&env.server)
            .await;
    }

    let checklist = env
        .client
        .create_checklist_with_items("C1", "Launch", &["first", "second"])
        .await
        .unwrap();

    let names: Vec<&str> = checklist.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(checklist.items.iter().all(|i| !i.checked));
}

#[tokio::test]
async fn test_create_checklist_with_items_stops_at_first_failure() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .and(path("/checklists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "CL1", "name": "Launch", "checkItems": []
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/checklists/CL1/checkItems"))
        .and(body_json(json!({"name": "first", "checked": false})))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid value for name"))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/checklists/CL1/checkItems"))
        .and(body_json(json!({"name": "second", "checked": false})))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let err = env
        .client
        .create_checklist_with_items("C1", "Launch", &["first", "second"])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_create_checklist_with_blank_item_makes_no_calls() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let err = env
        .client
        .create_checklist_with_items("C1", "Launch", &["ok", ""])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
