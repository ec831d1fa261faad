use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::approvals::ApprovalService;
use super::bookings::{BookingRequest, BookingService};
use super::contracts::ContractService;
use super::domain::{
    Actor, ActorRole, ApprovalDecision, ApprovalId, BookingDecision, BookingId, ContractId,
    GatewayRef, RoomId,
};
use super::gateway::{GatewayConfig, PaymentService};
use super::rooms::RoomRegistry;
use super::store::RentalStore;
use super::RentalError;

/// Service bundle the HTTP surface is built from.
pub struct RentalApi<S> {
    pub rooms: RoomRegistry<S>,
    pub approvals: ApprovalService<S>,
    pub bookings: BookingService<S>,
    pub contracts: Arc<ContractService<S>>,
    pub payments: PaymentService<S>,
}

impl<S: RentalStore> RentalApi<S> {
    pub fn new(store: Arc<S>, gateway: GatewayConfig) -> Self {
        let contracts = Arc::new(ContractService::new(store.clone()));
        Self {
            rooms: RoomRegistry::new(store.clone()),
            approvals: ApprovalService::new(store.clone()),
            bookings: BookingService::new(store.clone(), contracts.clone()),
            contracts,
            payments: PaymentService::new(store, gateway),
        }
    }
}

/// Router exposing the rental lifecycle endpoints.
///
/// Caller identity travels in `x-actor-id`/`x-actor-role` headers; session
/// authentication is an upstream concern. The gateway callback route is the
/// one deliberately unauthenticated entry point.
pub fn rental_router<S: RentalStore + 'static>(api: Arc<RentalApi<S>>) -> Router {
    Router::new()
        .route("/api/v1/rooms", post(register_room_handler::<S>))
        .route(
            "/api/v1/rooms/:room_id/maintenance",
            put(maintenance_handler::<S>),
        )
        .route("/api/v1/approvals", post(submit_approval_handler::<S>))
        .route(
            "/api/v1/approvals/:approval_id",
            put(decide_approval_handler::<S>),
        )
        .route("/api/v1/bookings", post(create_booking_handler::<S>))
        .route(
            "/api/v1/bookings/:booking_id",
            put(resolve_booking_handler::<S>),
        )
        .route("/api/v1/contracts", post(create_contract_handler::<S>))
        .route("/api/v1/contracts/:contract_id", get(get_contract_handler::<S>))
        .route(
            "/api/v1/payments/initiate",
            post(initiate_payment_handler::<S>),
        )
        .route("/payments/callback", get(payment_callback_handler::<S>))
        .route("/payments/result", get(payment_result_handler::<S>))
        .with_state(api)
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, RentalError> {
    let id = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or(RentalError::NotAuthorized)?;
    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .and_then(ActorRole::parse)
        .ok_or(RentalError::NotAuthorized)?;
    Ok(Actor::new(id.trim(), role))
}

fn error_response(error: RentalError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRoomRequest {
    #[serde(default)]
    room_id: Option<String>,
    rent_price: u64,
}

async fn register_room_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRoomRequest>,
) -> Response {
    let result = actor_from_headers(&headers)
        .and_then(|actor| api.rooms.register(&actor, request.room_id, request.rent_price));
    match result {
        Ok(room) => (StatusCode::CREATED, Json(room)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn maintenance_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Response {
    let result = actor_from_headers(&headers)
        .and_then(|actor| api.rooms.flag_maintenance(&actor, &RoomId(room_id)));
    match result {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitApprovalRequest {
    room_id: String,
    #[serde(default)]
    note: String,
}

async fn submit_approval_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Json(request): Json<SubmitApprovalRequest>,
) -> Response {
    let result = actor_from_headers(&headers).and_then(|actor| {
        api.approvals
            .submit(&actor, &RoomId(request.room_id), request.note)
    });
    match result {
        Ok(approval) => (StatusCode::CREATED, Json(approval)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct DecideApprovalRequest {
    decision: ApprovalDecision,
}

async fn decide_approval_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Path(approval_id): Path<String>,
    Json(request): Json<DecideApprovalRequest>,
) -> Response {
    let result = actor_from_headers(&headers).and_then(|actor| {
        api.approvals
            .decide(&actor, &ApprovalId(approval_id), request.decision)
    });
    match result {
        Ok(approval) => (StatusCode::OK, Json(approval)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_booking_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Response {
    let result =
        actor_from_headers(&headers).and_then(|actor| api.bookings.create(&actor, request));
    match result {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct ResolveBookingRequest {
    decision: BookingDecision,
}

async fn resolve_booking_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Json(request): Json<ResolveBookingRequest>,
) -> Response {
    let result = actor_from_headers(&headers).and_then(|actor| {
        api.bookings
            .resolve(&actor, &BookingId(booking_id), request.decision)
    });
    match result {
        Ok(resolution) => (StatusCode::OK, Json(resolution)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateContractRequest {
    booking_id: String,
}

/// Direct contract creation resolves the referenced pending booking through
/// the same atomic acceptance path the booking workflow uses.
async fn create_contract_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Json(request): Json<CreateContractRequest>,
) -> Response {
    let result = actor_from_headers(&headers).and_then(|actor| {
        api.bookings.resolve(
            &actor,
            &BookingId(request.booking_id),
            BookingDecision::Accepted,
        )
    });
    match result {
        Ok(resolution) => (StatusCode::CREATED, Json(resolution.contract)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn get_contract_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Path(contract_id): Path<String>,
) -> Response {
    let result = actor_from_headers(&headers)
        .and_then(|actor| api.contracts.get(&actor, &ContractId(contract_id)));
    match result {
        Ok(contract) => (StatusCode::OK, Json(contract)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentRequest {
    contract_id: String,
    amount: u64,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    client_ip: Option<String>,
}

async fn initiate_payment_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Json(request): Json<InitiatePaymentRequest>,
) -> Response {
    let result = actor_from_headers(&headers).and_then(|actor| {
        api.payments.initiate(
            &actor,
            &ContractId(request.contract_id),
            request.amount,
            request.note,
            request.client_ip,
        )
    });
    match result {
        Ok(initiated) => {
            let payload = json!({
                "payment": initiated.payment,
                "payUrl": initiated.pay_url,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Gateway-originated return leg. Unauthenticated by design; correlation is
/// purely the signed `pg_ref` parameter. Always answers with a redirect to
/// the client-visible result page and never echoes hash material.
async fn payment_callback_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    Query(raw_params): Query<HashMap<String, String>>,
) -> Response {
    let reference = raw_params
        .get(super::gateway::service::params::REF)
        .cloned()
        .unwrap_or_default();

    match api.payments.handle_callback(&raw_params) {
        Ok(outcome) => {
            let target = format!(
                "{}?status={}&ref={}",
                api.payments.result_page(),
                outcome.payment.status.label(),
                outcome.payment.gateway_ref.0
            );
            Redirect::to(&target).into_response()
        }
        Err(_) => {
            let target = format!(
                "{}?status=error&ref={}",
                api.payments.result_page(),
                reference
            );
            Redirect::to(&target).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentResultQuery {
    #[serde(rename = "ref")]
    reference: String,
}

async fn payment_result_handler<S: RentalStore>(
    State(api): State<Arc<RentalApi<S>>>,
    headers: HeaderMap,
    Query(query): Query<PaymentResultQuery>,
) -> Response {
    let result = actor_from_headers(&headers)
        .and_then(|actor| api.payments.query_result(&actor, &GatewayRef(query.reference)));
    match result {
        Ok(payment) => (StatusCode::OK, Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}
