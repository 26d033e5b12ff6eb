mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn todo_crud_round_trip() {
    let app = TestApp::new().await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/todos",
            Some(json!({"title": "Service the chiller", "description": "Before Friday"})),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let todo = response_json(created).await;
    assert_eq!(todo["title"], "Service the chiller");
    assert_eq!(todo["description"], "Before Friday");
    assert_eq!(todo["completed"], false);
    let uri = format!("/api/v1/todos/{}", todo["id"].as_i64().unwrap());

    let patched = app
        .request_authenticated(Method::PATCH, &uri, Some(json!({"completed": true})))
        .await;
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = response_json(patched).await;
    assert_eq!(patched["completed"], true);
    assert_eq!(patched["title"], "Service the chiller");
    assert_eq!(patched["description"], "Before Friday");

    let fetched = app.request_authenticated(Method::GET, &uri, None).await;
    assert_eq!(response_json(fetched).await, patched);

    let deleted = app.request_authenticated(Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app.request_authenticated(Method::GET, &uri, None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(gone).await["message"], "Todo not found");
}

#[tokio::test]
async fn listing_pages_in_id_order() {
    let app = TestApp::new().await;
    for title in ["one", "two", "three"] {
        app.request_authenticated(Method::POST, "/api/v1/todos", Some(json!({"title": title})))
            .await;
    }

    let all = response_json(
        app.request_authenticated(Method::GET, "/api/v1/todos", None)
            .await,
    )
    .await;
    let titles: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["one", "two", "three"]);

    let page = response_json(
        app.request_authenticated(Method::GET, "/api/v1/todos?skip=1&limit=1", None)
            .await,
    )
    .await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["title"], "two");
}

#[tokio::test]
async fn invalid_todos_are_unprocessable() {
    let app = TestApp::new().await;

    for body in [
        json!({"title": ""}),
        json!({"title": "x".repeat(201)}),
        json!({"title": "ok", "description": "d".repeat(1001)}),
        json!({"description": "no title"}),
    ] {
        let response = app
            .request_authenticated(Method::POST, "/api/v1/todos", Some(body.clone()))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{}",
            body
        );
    }
}

#[tokio::test]
async fn missing_todo_is_not_found_everywhere() {
    let app = TestApp::new().await;

    for method in [Method::GET, Method::DELETE] {
        let response = app
            .request_authenticated(method.clone(), "/api/v1/todos/424242", None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", method);
    }
    let patch = app
        .request_authenticated(
            Method::PATCH,
            "/api/v1/todos/424242",
            Some(json!({"title": "new"})),
        )
        .await;
    assert_eq!(patch.status(), StatusCode::NOT_FOUND);
}
