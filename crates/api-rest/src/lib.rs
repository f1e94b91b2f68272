//! # API REST
//!
//! REST API implementation for HMS.
//!
//! Handles:
//! - HTTP endpoints with axum under `/api`, guarded by the `x-api-key` header
//! - A WebSocket event stream on `/ws`
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for wire types and authentication, and `hms-core` for all behaviour.

#![warn(rust_2018_idioms)]

mod auth;
mod error;
mod handlers;
mod ws;

pub use error::{ApiError, ApiResult};

use api_shared::{
    AdmitPatientReq, AdmitPatientRes, AllocationRes, AssignRoomReq, AssignmentRes, CreateRoomReq,
    DashboardRes, ErrorRes, HealthRes, ListPatientsRes, ListRoomsRes, ListTransferSuggestionsRes,
    PatientRes, ReleaseRoomReq, RoomRes, TransferSuggestionRes, UpdatePatientReq, UpdateRoomReq,
    UpdateRoomStatusReq,
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use hms_core::{BroadcastSink, HospitalService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers
///
/// `events` is the same sink the service publishes to; WebSocket connections subscribe to it.
/// `api_key` of `None` disables the key check.
#[derive(Clone)]
pub struct AppState {
    pub service: HospitalService,
    pub events: BroadcastSink,
    pub api_key: Option<Arc<str>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_patients,
        handlers::waiting_patients,
        handlers::admit_patient,
        handlers::get_patient,
        handlers::update_patient,
        handlers::delete_patient,
        handlers::list_rooms,
        handlers::create_room,
        handlers::get_room,
        handlers::update_room,
        handlers::update_room_status,
        handlers::delete_room,
        handlers::assign_room,
        handlers::release_room,
        handlers::auto_allocate,
        handlers::transfer_suggestions,
        handlers::dashboard,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PatientRes,
        ListPatientsRes,
        AdmitPatientReq,
        AdmitPatientRes,
        UpdatePatientReq,
        RoomRes,
        ListRoomsRes,
        CreateRoomReq,
        UpdateRoomReq,
        UpdateRoomStatusReq,
        AssignRoomReq,
        ReleaseRoomReq,
        AssignmentRes,
        AllocationRes,
        TransferSuggestionRes,
        ListTransferSuggestionsRes,
        DashboardRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST application.
///
/// # Arguments
/// * `state` - Service handle, event sink and API key
///
/// # Returns
/// A router serving `/health`, `/ws`, `/api/*` and the Swagger UI.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::admit_patient),
        )
        .route("/patients/waiting", get(handlers::waiting_patients))
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .route(
            "/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route(
            "/rooms/:id",
            get(handlers::get_room)
                .put(handlers::update_room)
                .delete(handlers::delete_room),
        )
        .route("/rooms/:id/status", put(handlers::update_room_status))
        .route("/allocations/assign", post(handlers::assign_room))
        .route("/allocations/release", post(handlers::release_room))
        .route("/allocations/auto", post(handlers::auto_allocate))
        .route("/transfer-suggestions", get(handlers::transfer_suggestions))
        .route("/dashboard", get(handlers::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
