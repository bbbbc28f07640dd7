//! HTTP routes exercised through the router without binding a socket.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

use book_exchange::{
    api::{ApiState, router},
    config::ServiceConfig,
};

fn app() -> anyhow::Result<(TempDir, Router)> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("api.db"))?);
    let state = ApiState::from_db(db, ServiceConfig::new(temp_dir.path().to_path_buf()))?;
    Ok((temp_dir, router(Arc::new(state))))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    send_request(app, request).await
}

async fn send_request(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

async fn seed_books(app: &Router) -> anyhow::Result<()> {
    for (id, name, owner) in [("B123", "Dune", "b@x.com"), ("B900", "Emma", "a@x.com")] {
        let (status, _) = send(
            app,
            "PUT",
            &format!("/books/{id}"),
            Some(json!({ "name": name, "author": "Someone", "ownerEmail": owner })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
    }
    Ok(())
}

fn proposal(requester: &str, target: &str, offered: &str) -> Value {
    json!({
        "requesterEmail": requester,
        "targetBookId": target,
        "offeredBook": {
            "bookId": offered,
            "title": "Emma",
            "author": "Jane Austen",
            "isbn": "9780141439587",
            "condition": "good"
        }
    })
}

#[tokio::test]
async fn exchange_lifecycle_over_http() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    let (status, created) = send(&app, "POST", "/exchange/request", Some(proposal("a@x.com", "B123", "B900"))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["targetOwnerEmail"], "b@x.com");
    assert_eq!(created["offeredBook"]["isbn"], "9780141439587");
    let id = created["id"].as_str().expect("id").to_string();

    let (status, received) = send(&app, "GET", "/exchange/requests?userEmail=b@x.com&asTarget=true", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received.as_array().map(Vec::len), Some(1));

    // asTarget defaults to true
    let (_, default_view) = send(&app, "GET", "/exchange/requests?userEmail=b@x.com", None).await?;
    assert_eq!(default_view, received);

    let (_, sent) = send(&app, "GET", "/exchange/requests?userEmail=a@x.com&asTarget=false", None).await?;
    assert_eq!(sent[0]["id"], id.as_str());

    let (status, accepted) = send(&app, "POST", &format!("/exchange/{id}/status?status=accepted"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert!(accepted["decidedAt"].is_string());

    let (status, body) = send(&app, "POST", &format!("/exchange/{id}/status?status=rejected"), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_operation");

    let (status, fetched) = send(&app, "GET", &format!("/exchange/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "accepted");

    Ok(())
}

#[tokio::test]
async fn create_errors_map_to_statuses() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    let (status, body) = send(&app, "POST", "/exchange/request", Some(proposal("b@x.com", "B123", "B900"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_operation");

    let (status, body) = send(&app, "POST", "/exchange/request", Some(proposal("a@x.com", "B404", "B900"))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(&app, "POST", "/exchange/request", Some(json!({ "targetBookId": "B123" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    Ok(())
}

#[tokio::test]
async fn status_errors_map_to_statuses() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    let (status, _) = send(&app, "POST", "/exchange/exchange_1missing/status?status=accepted", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) = send(&app, "POST", "/exchange/request", Some(proposal("a@x.com", "B123", "B900"))).await?;
    let id = created["id"].as_str().expect("id").to_string();

    let (status, body) = send(&app, "POST", &format!("/exchange/{id}/status?status=maybe"), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = send(&app, "GET", "/exchange/exchange_1missing", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn notifications_and_catalog_routes() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    let (_, created) = send(&app, "POST", "/exchange/request", Some(proposal("a@x.com", "B123", "B900"))).await?;
    let id = created["id"].as_str().expect("id").to_string();
    send(&app, "POST", &format!("/exchange/{id}/status?status=rejected"), None).await?;

    let (status, owner_inbox) = send(&app, "GET", "/notifications?userEmail=b@x.com", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owner_inbox[0]["kind"], "request_created");
    assert_eq!(owner_inbox[0]["requestId"], id.as_str());

    let (_, requester_inbox) = send(&app, "GET", "/notifications?userEmail=a@x.com", None).await?;
    assert_eq!(requester_inbox[0]["kind"], "request_rejected");

    let (status, book) = send(&app, "GET", "/books/B123", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["ownerEmail"], "b@x.com");
    assert_eq!(book["quantity"], 1);

    let (status, _) = send(&app, "DELETE", "/books/B123", None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/books/B123", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the received list still carries the snapshot after the book is gone
    let (_, received) = send(&app, "GET", "/exchange/requests?userEmail=b@x.com", None).await?;
    assert_eq!(received[0]["targetBookTitle"], "Dune");

    let (status, health) = send(&app, "GET", "/status", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_json_validation_errors() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    // wrong field type
    let mut body = proposal("a@x.com", "B123", "B900");
    body["requesterEmail"] = json!(5);
    let (status, error) = send(&app, "POST", "/exchange/request", Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation");

    // not JSON at all
    let request = Request::builder()
        .method("POST")
        .uri("/exchange/request")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, error) = send_request(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation");

    // missing content type
    let request = Request::builder()
        .method("POST")
        .uri("/exchange/request")
        .body(Body::from(proposal("a@x.com", "B123", "B900").to_string()))?;
    let (status, error) = send_request(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation");

    let (status, error) = send(&app, "PUT", "/books/B777", Some(json!({ "name": 1 }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation");

    Ok(())
}

#[tokio::test]
async fn missing_query_parameters_get_json_validation_errors() -> anyhow::Result<()> {
    let (_dir, app) = app()?;
    seed_books(&app).await?;

    let (_, created) = send(&app, "POST", "/exchange/request", Some(proposal("a@x.com", "B123", "B900"))).await?;
    let id = created["id"].as_str().expect("id").to_string();

    for uri in [
        "/exchange/requests".to_string(),
        "/exchange/requests?userEmail=b@x.com&asTarget=maybe".to_string(),
        format!("/exchange/{id}/status"),
        "/notifications".to_string(),
    ] {
        let method = if uri.ends_with("/status") { "POST" } else { "GET" };
        let (status, error) = send(&app, method, &uri, None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error["error"], "validation", "{uri}");
    }

    // the request was left pending
    let (_, fetched) = send(&app, "GET", &format!("/exchange/{id}"), None).await?;
    assert_eq!(fetched["status"], "pending");
    Ok(())
}
