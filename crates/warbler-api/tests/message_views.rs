mod common;

use axum::http::StatusCode;
use common::{TestApp, body_text, location};
use warbler_types::flash::Flash;

fn setup() -> (TestApp, i64) {
    let app = TestApp::new();
    let user_id = app.signup("testuser", "test@test.com", "testuser");
    (app, user_id)
}

#[tokio::test]
async fn add_message() {
    let (app, user_id) = setup();

    let resp = app.post("/messages/new", "text=Hello", Some(user_id)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/users/{user_id}"));

    let messages = app.db().messages_for_user(user_id, 100).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Hello");
}

#[tokio::test]
async fn unauthorized_add_message() {
    let (app, user_id) = setup();

    let resp = app.post("/messages/new", "text=Hi+Ya", None).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(app.flashes(&resp).contains(&Flash::danger("Access unauthorized.")));
    assert!(app.db().messages_for_user(user_id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn empty_message_rerenders_form() {
    let (app, user_id) = setup();

    let resp = app.post("/messages/new", "text=+++", Some(user_id)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Message text is required."));
    assert!(app.db().messages_for_user(user_id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let (app, user_id) = setup();

    let form = format!("text={}", "a".repeat(141));
    let resp = app.post("/messages/new", &form, Some(user_id)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(app.db().messages_for_user(user_id, 100).unwrap().is_empty());
}

#[tokio::test]
async fn new_message_form_requires_login() {
    let (app, user_id) = setup();

    let resp = app.get("/messages/new", None).await;
    app.assert_unauthorized(&resp);

    let resp = app.get("/messages/new", Some(user_id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_message() {
    let (app, user_id) = setup();
    app.message(1000, user_id, "This is a warble");

    let resp = app.post("/messages/1000/delete", "", Some(user_id)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/users/{user_id}"));
    assert!(app.db().get_message(1000).unwrap().is_none());
}

#[tokio::test]
async fn unauthorized_delete_message() {
    let (app, user_id) = setup();
    app.message(1000, user_id, "This is a warble");

    let resp = app.post("/messages/1000/delete", "", None).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(app.flashes(&resp).contains(&Flash::danger("Access unauthorized.")));
    assert!(app.db().get_message(1000).unwrap().is_some());
}

#[tokio::test]
async fn other_user_cannot_delete_message() {
    let (app, user_id) = setup();
    let other_id = app.signup("other", "other@test.com", "otherpass");
    app.message(1000, user_id, "This is a warble");

    let resp = app.post("/messages/1000/delete", "", Some(other_id)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(app.flashes(&resp).contains(&Flash::danger("Access unauthorized.")));
    assert!(app.db().get_message(1000).unwrap().is_some());
}

#[tokio::test]
async fn delete_missing_message_is_not_found() {
    let (app, user_id) = setup();

    let resp = app.post("/messages/1000/delete", "", Some(user_id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn show_message() {
    let (app, user_id) = setup();
    app.message(1000, user_id, "This is a warble");

    let resp = app.get("/messages/1000", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("This is a warble"));
    assert!(html.contains("@testuser"));

    let resp = app.get("/messages/9999", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
