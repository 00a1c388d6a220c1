//! API integration tests

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use librarium_server::api::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::app_state;

/// Send one request through the router and decode the JSON body
async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, actor: bool) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if actor {
        builder = builder
            .header("X-Actor-Id", "librarian-1")
            .header("X-Actor-Role", "librarian");
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_book(app: &Router, title: &str, copies: i32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "title": title,
            "author": "Sudha Murty",
            "total_copies": copies,
            "category": "Fiction"
        })),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(app_state());

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_mutations_require_actor_headers() {
    let app = create_router(app_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({"title": "Wise and Otherwise", "author": "Sudha Murty", "total_copies": 1})),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");
}

#[tokio::test]
async fn test_invalid_book_is_rejected() {
    let app = create_router(app_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({"title": "  ", "author": "Sudha Murty", "total_copies": 0})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_issue_return_over_http() {
    let app = create_router(app_state());
    let book_id = create_book(&app, "How I Taught My Grandmother to Read", 1).await;
    let borrower = json!({"name": "Priya", "roll": "4C-08", "class_name": "4", "section": "C"});

    let (status, loan) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(json!({"book_id": book_id, "borrower": borrower})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "issued");
    let loan_id = loan["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(json!({"book_id": book_id, "borrower": {"name": "Ravi", "roll": "4C-09"}})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "OutOfStock");

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None, false).await;
    assert_eq!(book["available_copies"], 0);

    let (status, fine) = send(&app, Method::GET, &format!("/api/v1/loans/{}/fine", loan_id), None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fine["days_overdue"], 0);
    assert_eq!(fine["currency"], "INR");

    let (status, receipt) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        None,
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["loan"]["status"], "returned");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        None,
        true,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyReturned");

    let (_, loans) = send(&app, Method::GET, "/api/v1/loans?borrower_roll=4C-08", None, false).await;
    assert_eq!(loans.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reservation_over_http() {
    let app = create_router(app_state());
    let book_id = create_book(&app, "Three Thousand Stitches", 2).await;
    let hold = json!({"book_id": book_id, "requester_id": "5A-02", "requester_name": "Emma"});

    let (status, created) = send(&app, Method::POST, "/api/v1/reservations", Some(hold.clone()), true).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");

    let (status, body) = send(&app, Method::POST, "/api/v1/reservations", Some(hold), true).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DuplicateReservation");

    let (_, queue) = send(
        &app,
        Method::GET,
        &format!("/api/v1/books/{}/reservations", book_id),
        None,
        false,
    )
    .await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/reservations/{}", created["id"].as_str().unwrap());
    let (status, cancelled) = send(&app, Method::DELETE, &uri, None, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (status, _) = send(&app, Method::DELETE, &uri, None, true).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_issue_request_flow_over_http() {
    let app = create_router(app_state());
    let book_id = create_book(&app, "The Old Man and His God", 1).await;

    let (status, request) = send(
        &app,
        Method::POST,
        "/api/v1/issue-requests",
        Some(json!({
            "book_guess": "old man god murty",
            "requester": {"name": "Tara", "roll": "3B-05"}
        })),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");
    let approve_uri = format!("/api/v1/issue-requests/{}/approve", request["id"].as_str().unwrap());

    // no book match yet
    let (status, _) = send(&app, Method::POST, &approve_uri, None, true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = send(
        &app,
        Method::POST,
        &approve_uri,
        Some(json!({"book_id": book_id})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert!(approved["loan_id"].is_string());

    let (status, body) = send(&app, Method::POST, &approve_uri, None, true).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidState");

    let (_, summary) = send(&app, Method::GET, "/api/v1/stats", None, false).await;
    assert_eq!(summary["active_loans"], 1);
    assert_eq!(summary["pending_requests"], 0);
}

#[tokio::test]
async fn test_malformed_approval_leaves_request_pending() {
    let app = create_router(app_state());
    let guessed = create_book(&app, "Grandma's Bag of Stories", 1).await;

    let (_, request) = send(
        &app,
        Method::POST,
        "/api/v1/issue-requests",
        Some(json!({
            "book_id": guessed,
            "book_guess": "grandma stories",
            "requester": {"name": "Uma", "roll": "3B-06"}
        })),
        true,
    )
    .await;
    let request_uri = format!("/api/v1/issue-requests/{}", request["id"].as_str().unwrap());

    for body in [json!({"book_id": "not-a-uuid"}), json!({"bookid": guessed})] {
        let (status, error) = send(
            &app,
            Method::POST,
            &format!("{}/approve", request_uri),
            Some(body),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "BadValue");
    }

    let (_, current) = send(&app, Method::GET, &request_uri, None, false).await;
    assert_eq!(current["status"], "pending");
    assert!(current["loan_id"].is_null());
    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", guessed), None, false).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let app = create_router(app_state());
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/books/6f1c1f0e-36a3-4c55-9d6b-8f6f7c6a8e11",
        None,
        false,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchEntity");
}
