//! Router-level specifications: actor headers, status mapping, and the
//! gateway callback redirect.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use roomlet::workflows::rental::gateway::service::{params, SUCCESS_CODE};
use roomlet::workflows::rental::gateway::{signing, GatewayConfig};
use roomlet::workflows::rental::{rental_router, MemoryRentalStore, RentalApi};

const SECRET: &str = "http-secret";

fn router() -> axum::Router {
    let store = Arc::new(MemoryRentalStore::default());
    let api = Arc::new(RentalApi::new(
        store,
        GatewayConfig {
            endpoint: "https://gateway.test/pay".to_string(),
            secret: SECRET.to_string(),
            return_url: "http://127.0.0.1:3000/payments/callback".to_string(),
            result_page: "http://127.0.0.1:3000/payments/result".to_string(),
            locale: "en".to_string(),
        },
    ));
    rental_router(api)
}

fn request(
    method: &str,
    uri: &str,
    actor: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn missing_actor_headers_are_forbidden() {
    let app = router();
    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/rooms",
            None,
            Some(json!({ "rentPrice": 100 })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_against_draft_room_conflicts() {
    let app = router();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/rooms",
            Some(("host-1", "host")),
            Some(json!({ "roomId": "room-a", "rentPrice": 900 })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/bookings",
            Some(("t1", "tenant")),
            Some(json!({
                "roomId": "room-a",
                "startDate": "2026-09-01",
                "endDate": "2026-12-01",
            })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().expect("error field").contains("room"));
}

#[tokio::test]
async fn approval_flow_makes_room_bookable_over_http() {
    let app = router();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/rooms",
            Some(("host-1", "host")),
            Some(json!({ "roomId": "room-b", "rentPrice": 1200 })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/approvals",
            Some(("host-1", "host")),
            Some(json!({ "roomId": "room-b", "note": "go live" })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let approval = json_body(response).await;
    let approval_id = approval["id"].as_str().expect("approval id").to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/approvals/{approval_id}"),
            Some(("admin-1", "admin")),
            Some(json!({ "decision": "approved" })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/bookings",
            Some(("t1", "tenant")),
            Some(json!({
                "roomId": "room-b",
                "startDate": "2026-09-01",
                "endDate": "2026-12-01",
            })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = json_body(response).await;
    assert_eq!(booking["status"], "pending");
}

#[tokio::test]
async fn callback_redirects_to_result_page() {
    let app = router();

    // Walk the lifecycle far enough to hold a pending payment.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/rooms",
            Some(("host-1", "host")),
            Some(json!({ "roomId": "room-c", "rentPrice": 4500000 })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/approvals",
            Some(("host-1", "host")),
            Some(json!({ "roomId": "room-c" })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let approval = json_body(response).await;
    let approval_id = approval["id"].as_str().expect("approval id").to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/approvals/{approval_id}"),
            Some(("admin-1", "admin")),
            Some(json!({ "decision": "approved" })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/bookings",
            Some(("t1", "tenant")),
            Some(json!({
                "roomId": "room-c",
                "startDate": "2026-09-01",
                "endDate": "2026-12-01",
            })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = json_body(response).await;
    let booking_id = booking["id"].as_str().expect("booking id").to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/bookings/{booking_id}"),
            Some(("host-1", "host")),
            Some(json!({ "decision": "accepted" })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::OK);
    let resolution = json_body(response).await;
    let contract_id = resolution["contract"]["id"]
        .as_str()
        .expect("contract id")
        .to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/payments/initiate",
            Some(("t1", "tenant")),
            Some(json!({ "contractId": contract_id, "amount": 4500000 })),
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let initiated = json_body(response).await;
    let gateway_ref = initiated["payment"]["gatewayRef"]
        .as_str()
        .expect("gateway ref")
        .to_string();

    // Deliver the signed callback the way the gateway would: a plain GET.
    let mut fields = BTreeMap::new();
    fields.insert(params::REF.to_string(), gateway_ref.clone());
    fields.insert(params::RESPONSE_CODE.to_string(), SUCCESS_CODE.to_string());
    let canonical = signing::canonical_query(&fields);
    let mac = signing::sign(&canonical, SECRET);
    let uri = format!(
        "/payments/callback?{canonical}&{}={mac}",
        signing::SIGNATURE_PARAM
    );

    let response = app
        .clone()
        .oneshot(request("GET", &uri, None, None))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect target");
    assert!(location.contains("status=paid"));
    assert!(location.contains(&format!("ref={gateway_ref}")));

    // The owning tenant can read the settled result; a stranger cannot.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/payments/result?ref={gateway_ref}"),
            Some(("t1", "tenant")),
            None,
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::OK);
    let payment = json_body(response).await;
    assert_eq!(payment["status"], "paid");

    let response = app
        .oneshot(request(
            "GET",
            &format!("/payments/result?ref={gateway_ref}"),
            Some(("t2", "tenant")),
            None,
        ))
        .await
        .expect("request completes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
