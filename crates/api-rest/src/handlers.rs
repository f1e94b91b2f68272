use crate::error::{ApiError, ApiResult};
use crate::AppState;
use api_shared::{
    AdmitPatientReq, AdmitPatientRes, AllocationRes, AssignRoomReq, AssignmentRes, CreateRoomReq,
    DashboardRes, ErrorRes, HealthRes, HealthService, ListPatientsRes, ListRoomsRes,
    ListTransferSuggestionsRes, PatientRes, ReleaseRoomReq, RoomRes, UpdatePatientReq,
    UpdateRoomReq, UpdateRoomStatusReq,
};
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use hms_core::{
    Condition, HospitalError, PatientId, PatientQuery, PatientStatus, RoomId, RoomQuery,
    RoomStatus, RoomType,
};
use serde::Deserialize;
use utoipa::IntoParams;

fn parse_patient_id(id: &str) -> ApiResult<PatientId> {
    PatientId::parse(id).map_err(|e| ApiError::from(HospitalError::from(e)))
}

fn parse_room_id(id: &str) -> ApiResult<RoomId> {
    RoomId::parse(id).map_err(|e| ApiError::from(HospitalError::from(e)))
}

// ===== HEALTH =====

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used by monitoring and load balancer health checks. Not behind the API key.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// ===== PATIENTS =====

/// Filters for `GET /api/patients`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientFilter {
    /// `Pending`, `Admitted` or `Discharged`.
    pub status: Option<String>,
    /// `Critical`, `Stable` or `Normal`.
    pub condition: Option<String>,
}

impl PatientFilter {
    fn to_query(&self) -> ApiResult<PatientQuery> {
        let statuses = self
            .status
            .as_deref()
            .map(|s| s.parse::<PatientStatus>())
            .transpose()?
            .map(|s| vec![s]);
        let condition = self
            .condition
            .as_deref()
            .map(|c| c.parse::<Condition>())
            .transpose()?;
        Ok(PatientQuery {
            statuses,
            condition,
            ..Default::default()
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/patients",
    params(PatientFilter),
    responses(
        (status = 200, description = "Patients ordered by admission", body = ListPatientsRes),
        (status = 400, description = "Bad filter value", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(filter): Query<PatientFilter>,
) -> ApiResult<Json<ListPatientsRes>> {
    let patients = state.service.list_patients(&filter.to_query()?)?;
    Ok(Json(ListPatientsRes::from_patients(&patients)))
}

#[utoipa::path(
    get,
    path = "/api/patients/waiting",
    responses(
        (status = 200, description = "Waiting patients in allocation order", body = ListPatientsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Patients without a room, most urgent first. The head of the list is the next patient
/// auto-allocation will serve.
#[axum::debug_handler]
pub async fn waiting_patients(State(state): State<AppState>) -> ApiResult<Json<ListPatientsRes>> {
    let patients = state.service.waiting_patients()?;
    Ok(Json(ListPatientsRes::from_patients(&patients)))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = AdmitPatientReq,
    responses(
        (status = 201, description = "Patient admitted", body = AdmitPatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Admit a new patient
///
/// Patients admitted with status `Admitted` trigger auto-allocation; the outcome is returned in
/// `allocation`. Allocation serves the most urgent waiting patient, which may be someone other
/// than the patient just admitted.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the name is empty, the age is out of range, or an enum value is unknown.
#[axum::debug_handler]
pub async fn admit_patient(
    State(state): State<AppState>,
    Json(req): Json<AdmitPatientReq>,
) -> ApiResult<(StatusCode, Json<AdmitPatientRes>)> {
    let admission = state.service.admit_patient(req.into_new_patient()?)?;
    Ok((
        StatusCode::CREATED,
        Json(AdmitPatientRes {
            patient: PatientRes::from(&admission.patient),
            allocation: admission.allocation.as_ref().map(AllocationRes::from),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id (32 hex characters)")),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<PatientRes>> {
    let patient = state.service.get_patient(&parse_patient_id(&id)?)?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id (32 hex characters)")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// Update a patient's profile. Changing the condition recomputes the priority. Room and status
/// are not editable here.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdatePatientReq>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_patient_id(&id)?;
    let patient = state.service.update_patient(&id, req.into_update()?)?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id (32 hex characters)")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Patient still holds a room", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_patient(&parse_patient_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== ROOMS =====

/// Filters for `GET /api/rooms`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomFilter {
    /// `ICU`, `General`, `Private`, `Emergency` or `Surgery`.
    pub room_type: Option<String>,
    /// `Available`, `Occupied`, `Maintenance` or `Cleaning`.
    pub status: Option<String>,
    pub floor: Option<i32>,
    /// Only rooms that can take a patient now.
    #[serde(default)]
    pub available: bool,
}

impl RoomFilter {
    fn to_query(&self) -> ApiResult<RoomQuery> {
        let room_types = self
            .room_type
            .as_deref()
            .map(|t| t.parse::<RoomType>())
            .transpose()?
            .map(|t| vec![t]);
        let status = self
            .status
            .as_deref()
            .map(|s| s.parse::<RoomStatus>())
            .transpose()?;
        Ok(RoomQuery {
            room_types,
            status,
            floor: self.floor,
            available_only: self.available,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    params(RoomFilter),
    responses(
        (status = 200, description = "Rooms ordered by floor then number", body = ListRoomsRes),
        (status = 400, description = "Bad filter value", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(filter): Query<RoomFilter>,
) -> ApiResult<Json<ListRoomsRes>> {
    let rooms = state.service.list_rooms(&filter.to_query()?)?;
    Ok(Json(ListRoomsRes::from_rooms(&rooms)))
}

#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoomReq,
    responses(
        (status = 201, description = "Room created", body = RoomRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 409, description = "Room number already in use", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomReq>,
) -> ApiResult<(StatusCode, Json<RoomRes>)> {
    let room = state.service.create_room(req.into_new_room()?)?;
    Ok((StatusCode::CREATED, Json(RoomRes::from(&room))))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room id (32 hex characters)")),
    responses(
        (status = 200, description = "Room", body = RoomRes),
        (status = 404, description = "Room not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_room(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<RoomRes>> {
    let room = state.service.get_room(&parse_room_id(&id)?)?;
    Ok(Json(RoomRes::from(&room)))
}

#[utoipa::path(
    put,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room id (32 hex characters)")),
    request_body = UpdateRoomReq,
    responses(
        (status = 200, description = "Room updated", body = RoomRes),
        (status = 404, description = "Room not found", body = ErrorRes),
        (status = 409, description = "Room type change while occupied, or duplicate number", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_room(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateRoomReq>,
) -> ApiResult<Json<RoomRes>> {
    let id = parse_room_id(&id)?;
    let room = state.service.update_room(&id, req.into_update()?)?;
    Ok(Json(RoomRes::from(&room)))
}

#[utoipa::path(
    put,
    path = "/api/rooms/{id}/status",
    params(("id" = String, Path, description = "Room id (32 hex characters)")),
    request_body = UpdateRoomStatusReq,
    responses(
        (status = 200, description = "Status changed", body = RoomRes),
        (status = 404, description = "Room not found", body = ErrorRes),
        (status = 409, description = "Transition not allowed", body = ErrorRes)
    )
)]
/// Change the status of an unoccupied room
///
/// Allowed transitions: `Cleaning -> Available`, `Maintenance -> Available`,
/// `Available -> Maintenance` and `Cleaning -> Maintenance`. `Occupied` is only set by
/// assignment.
#[axum::debug_handler]
pub async fn update_room_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateRoomStatusReq>,
) -> ApiResult<Json<RoomRes>> {
    let id = parse_room_id(&id)?;
    let room = state.service.update_room_status(&id, req.target()?)?;
    Ok(Json(RoomRes::from(&room)))
}

#[utoipa::path(
    delete,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room id (32 hex characters)")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 404, description = "Room not found", body = ErrorRes),
        (status = 409, description = "Room is occupied", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_room(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_room(&parse_room_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== ALLOCATION =====

#[utoipa::path(
    post,
    path = "/api/allocations/assign",
    request_body = AssignRoomReq,
    responses(
        (status = 200, description = "Patient assigned", body = AssignmentRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "Patient or room not found", body = ErrorRes),
        (status = 409, description = "Room not available or patient discharged", body = ErrorRes)
    )
)]
/// Assign a patient to a specific room
///
/// A patient who already holds a room is moved; the old room goes to `Cleaning`.
///
/// # Errors
/// Returns `409 Conflict` if:
/// - the room is occupied or not `Available` (including losing a race to another request),
/// - the patient has been discharged.
#[axum::debug_handler]
pub async fn assign_room(
    State(state): State<AppState>,
    Json(req): Json<AssignRoomReq>,
) -> ApiResult<Json<AssignmentRes>> {
    let (patient_id, room_id) = req.ids()?;
    let assignment = state.service.assign_room(&patient_id, &room_id)?;
    Ok(Json(AssignmentRes::from(&assignment)))
}

#[utoipa::path(
    post,
    path = "/api/allocations/release",
    request_body = ReleaseRoomReq,
    responses(
        (status = 200, description = "Patient discharged, room sent to cleaning", body = AssignmentRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Patient has no room", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn release_room(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRoomReq>,
) -> ApiResult<Json<AssignmentRes>> {
    let released = state.service.release_room(&req.id()?)?;
    Ok(Json(AssignmentRes::from(&released)))
}

#[utoipa::path(
    post,
    path = "/api/allocations/auto",
    responses(
        (status = 200, description = "Allocation outcome; success=false is a normal result", body = AllocationRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn auto_allocate(State(state): State<AppState>) -> ApiResult<Json<AllocationRes>> {
    let outcome = state.service.auto_allocate()?;
    Ok(Json(AllocationRes::from(&outcome)))
}

// ===== READ MODELS =====

#[utoipa::path(
    get,
    path = "/api/transfer-suggestions",
    responses(
        (status = 200, description = "Patients whose room type mismatches their condition", body = ListTransferSuggestionsRes)
    )
)]
#[axum::debug_handler]
pub async fn transfer_suggestions(
    State(state): State<AppState>,
) -> ApiResult<Json<ListTransferSuggestionsRes>> {
    let suggestions = state.service.transfer_suggestions()?;
    Ok(Json(ListTransferSuggestionsRes::from_suggestions(&suggestions)))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Ward overview", body = DashboardRes)
    )
)]
#[axum::debug_handler]
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardRes>> {
    Ok(Json(DashboardRes::from(state.service.summary()?)))
}
