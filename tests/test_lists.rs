mod common;

use common::TestEnvironment;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn board_lists() -> serde_json::Value {
    json!([
        {"id": "L0", "name": "Meeting", "closed": true, "idBoard": "B1"},
        {"id": "L1", "name": "General", "closed": false, "idBoard": "B1"},
        {"id": "L2", "name": "Meeting", "closed": false, "idBoard": "B1"}
    ])
}

#[tokio::test]
async fn test_get_board_lists() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/boards/B1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_lists()))
        .expect(1)
        .mount(&env.server)
        .await;

    let lists = env.client.get_board_lists("B1").await.unwrap();
    let ids: Vec<&str> = lists.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["L0", "L1", "L2"]);
    assert!(lists[0].closed);
}

#[tokio::test]
async fn test_get_list() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/lists/L1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "L1", "name": "General", "closed": false, "idBoard": "B1"
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let list = env.client.get_list("L1").await.unwrap();
    assert_eq!(list.name, "General");
}

#[tokio::test]
async fn test_create_list() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("POST"))
        .and(path("/lists"))
        .and(body_json(json!({"name": "Events", "idBoard": "B1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "L9", "name": "Events", "closed": false, "idBoard": "B1"
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let list = env.client.create_list("B1", "Events").await.unwrap();
    assert_eq!(list.id, "L9");
}

#[tokio::test]
async fn test_find_or_create_list_reuses_open_list() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/boards/B1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_lists()))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lists"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let list = env.client.find_or_create_list("B1", "Meeting").await.unwrap();
    // The archived "Meeting" list is skipped.
    assert_eq!(list.id, "L2");
}

#[tokio::test]
async fn test_find_or_create_list_creates_missing_list() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/boards/B1/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_lists()))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lists"))
        .and(body_json(json!({"name": "Events", "idBoard": "B1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "L3", "name": "Events", "closed": false, "idBoard": "B1"
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let list = env.client.find_or_create_list("B1", "Events").await.unwrap();
    assert_eq!(list.id, "L3");
}

#[tokio::test]
async fn test_validate_board_access() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/boards/B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "B1", "name": "Inbox", "url": "https://trello.com/b/B1"
        })))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/boards/B2"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&env.server)
        .await;

    assert!(env.client.validate_board_access("B1").await.unwrap());
    assert!(!env.client.validate_board_access("B2").await.unwrap());

    let board = env.client.get_board("B1").await.unwrap();
    assert_eq!(board.name, "Inbox");
}

#[tokio::test]
async fn test_validate_board_access_propagates_server_errors() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    Mock::given(method("GET"))
        .and(path("/boards/B1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&env.server)
        .await;

    let err = env.client.validate_board_access("B1").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}
