mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;
use std::sync::Arc;
use trailer_invest::MemoryAuditSink;

#[tokio::test]
async fn manager_creates_trailer_and_creation_is_audited() {
    let audit = Arc::new(MemoryAuditSink::new());
    let app = build_proxied_app(portfolio_repo(), audit.clone());

    let mut req = request(
        Method::POST,
        "/api/trailers",
        Some(MANAGER),
        Some(json!({
            "code": "TRL-0042",
            "model": "Schmitz S.KO",
            "purchase_date": "2024-03-01"
        })),
    );
    req.headers_mut()
        .insert("x-forwarded-for", "192.0.2.10".parse().unwrap());
    let (status, body) = send(app, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], "TRL-0042");
    assert_eq!(body["purchase_date"], "2024-03-01");

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "trailer_created");
    assert_eq!(entries[0].entity_type, "trailer");
    assert_eq!(entries[0].actor_id, Some(MANAGER));
    assert_eq!(entries[0].entity_id, body["id"].as_str().map(str::to_string));
    assert_eq!(entries[0].detail["role"], "manager");
    assert_eq!(entries[0].source_address.as_deref(), Some("192.0.2.10"));
}

#[tokio::test]
async fn created_trailer_shows_up_in_fleet_listing() {
    let audit = Arc::new(MemoryAuditSink::new());
    let state = build_state(portfolio_repo(), audit);

    let (status, _) = send(
        trailer_invest::create_router(state.clone()),
        request(
            Method::POST,
            "/api/trailers",
            Some(ADMIN),
            Some(json!({ "code": "TRL-7", "model": "Krone SD" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        trailer_invest::create_router(state),
        request(Method::GET, "/api/trailers", Some(INVESTOR), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["code"], "TRL-7");
}

#[tokio::test]
async fn admin_generates_month_and_run_is_audited() {
    let audit = Arc::new(MemoryAuditSink::new());
    let app = build_app(portfolio_repo(), audit.clone());

    let (status, body) = send(
        app,
        request(Method::POST, "/api/financial/generate/2025-10", Some(ADMIN), None),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "month": "2025-10", "generated": 3 }));

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "financial_generated");
    assert_eq!(entries[0].entity_type, "month");
    assert_eq!(entries[0].entity_id.as_deref(), Some("2025-10"));
    assert_eq!(entries[0].detail["generated"], 3);
}

#[tokio::test]
async fn manager_cannot_generate_month() {
    let audit = Arc::new(MemoryAuditSink::new());
    let app = build_app(portfolio_repo(), audit.clone());

    let (status, _) = send(
        app,
        request(Method::POST, "/api/financial/generate/2025-10", Some(MANAGER), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(audit.entries()[0].detail["permitted_roles"], json!(["admin"]));
    assert_eq!(audit.count_action("financial_generated"), 0);
}

#[tokio::test]
async fn profile_reflects_resolved_identity() {
    let app = build_app(portfolio_repo(), Arc::new(MemoryAuditSink::new()));

    let (status, body) = send(app, request(Method::GET, "/api/auth/me", Some(INVESTOR), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": INVESTOR.to_string(), "role": "investor" }));
}

#[tokio::test]
async fn tracking_accepts_uppercase_trailer_codes() {
    let app = build_app(portfolio_repo(), Arc::new(MemoryAuditSink::new()));

    let (status, body) = send(
        app,
        request(Method::GET, "/api/tracking/TRL-0042", Some(INVESTOR), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["trailer_code"], "TRL-0042");
}

#[tokio::test]
async fn lowercase_tracking_code_is_ungoverned() {
    let audit = Arc::new(MemoryAuditSink::new());
    let app = build_app(portfolio_repo(), audit.clone());

    let (status, _) = send(
        app,
        request(Method::GET, "/api/tracking/trl-0042", Some(ADMIN), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(audit.entries().is_empty());
}

#[tokio::test]
async fn governed_route_without_handler_is_404_after_authorization() {
    let app = build_app(portfolio_repo(), Arc::new(MemoryAuditSink::new()));

    let (status, body) = send(
        app,
        request(Method::GET, "/api/financial/summary", Some(MANAGER), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Not found" }));
}
