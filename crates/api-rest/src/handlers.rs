//! HTTP handlers.
//!
//! Handlers are thin: parse identifiers and bodies, call one core service, convert the result
//! into a wire type. Admin-only handlers take an [`AdminGuard`] argument.

use crate::admin::AdminGuard;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use api_shared::{
    CategoriesRes, CreateOrderReq, CreateOrderRes, CreatePrescriptionReq, CreatePrescriptionRes,
    DashboardRes, ErrorRes, HealthRes, HealthService, ListLoginAttemptsRes, ListMedicinesRes,
    ListOrdersRes, ListPatientsRes, LoginReq, LoginRes, MoveReq, PharmacyRes, QueueBoardRes,
    QueueOrderRes, RegisterReq, RegisterRes, ReorderReq, SuccessRes,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use klinik_core::medicine::CatalogQuery;
use klinik_core::patient::PatientForm;
use klinik_core::queue::MoveDirection;
use klinik_core::view_prefs::ViewPrefs;
use klinik_core::RecordId;
use serde::Deserialize;
use utoipa::IntoParams;

fn parse_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::parse(raw).map_err(|e| ApiError::from(klinik_core::ClinicError::from(e)))
}

fn ids(ids: Vec<RecordId>) -> QueueOrderRes {
    QueueOrderRes {
        queue_entry_ids: ids.iter().map(ToString::to_string).collect(),
    }
}

// ==== QUERY PARAMETERS ====

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// RFC 3339 instant; entries created at or before it are hidden from this response.
    pub hidden_before: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MedicineQuery {
    /// Case-insensitive match on name or description.
    pub text: Option<String>,
    /// Exact category; "All" matches any.
    pub category: Option<String>,
}

// ==== PUBLIC ====

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health_for(
        state.services.store().backend_name(),
    ))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Patient registered and queued", body = RegisterRes),
        (status = 400, description = "A required field is empty", body = ErrorRes),
        (status = 503, description = "Queue number could not be issued", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<(StatusCode, Json<RegisterRes>)> {
    let form = PatientForm::from(req);
    let receipt = state.services.registration.register(&form)?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

#[utoipa::path(
    get,
    path = "/queue",
    responses(
        (status = 200, description = "Public queue board", body = QueueBoardRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn queue_board(State(state): State<AppState>) -> ApiResult<Json<QueueBoardRes>> {
    let board = state.services.views.queue_board()?;
    Ok(Json(board.into()))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginRes),
        (status = 401, description = "Invalid username or password", body = ErrorRes),
        (status = 500, description = "Audit record could not be written", body = ErrorRes)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    state.services.auth.login(&req.username, &req.password)?;
    Ok(Json(LoginRes {
        ok: true,
        username: req.username,
    }))
}

#[utoipa::path(
    get,
    path = "/medicines",
    params(MedicineQuery),
    responses(
        (status = 200, description = "Matching catalog medicines", body = ListMedicinesRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn list_medicines(
    State(state): State<AppState>,
    Query(query): Query<MedicineQuery>,
) -> ApiResult<Json<ListMedicinesRes>> {
    let query = CatalogQuery {
        text: query.text,
        category: query.category,
    };
    let medicines = state.services.catalog.search(&query)?;
    Ok(Json(ListMedicinesRes {
        medicines: medicines.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/medicines/categories",
    responses(
        (status = 200, description = "Distinct catalog categories", body = CategoriesRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<CategoriesRes>> {
    let categories = state.services.catalog.categories()?;
    Ok(Json(CategoriesRes { categories }))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Order placed", body = CreateOrderRes),
        (status = 400, description = "Empty cart, zero quantity or out-of-stock medicine", body = ErrorRes),
        (status = 404, description = "Unknown medicine", body = ErrorRes),
        (status = 503, description = "Order number could not be issued", body = ErrorRes)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderReq>,
) -> ApiResult<(StatusCode, Json<CreateOrderRes>)> {
    let lines = req
        .items
        .iter()
        .map(|item| Ok((parse_id(&item.medicine_id)?, item.quantity)))
        .collect::<ApiResult<Vec<_>>>()?;

    let orders = &state.services.orders;
    let cart = orders.build_cart(&lines)?;
    let receipt = orders.submit(&cart)?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

// ==== ADMIN ====

#[utoipa::path(
    get,
    path = "/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Admin dashboard", body = DashboardRes),
        (status = 400, description = "Malformed hidden_before", body = ErrorRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes)
    )
)]
pub async fn dashboard(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardRes>> {
    let hidden_before = query
        .hidden_before
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| ApiError::bad_request(format!("invalid hidden_before '{raw}': {e}")))
        })
        .transpose()?;

    let prefs = ViewPrefs::hiding_before(hidden_before);
    let dashboard = state.services.views.dashboard(&prefs)?;
    Ok(Json(dashboard.into()))
}

#[utoipa::path(
    post,
    path = "/queue/{id}/approve",
    params(("id" = String, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "Entry is being examined", body = SuccessRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown queue entry", body = ErrorRes)
    )
)]
pub async fn approve(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessRes>> {
    state.services.queue.approve(&parse_id(&id)?)?;
    Ok(Json(SuccessRes { success: true }))
}

#[utoipa::path(
    post,
    path = "/queue/{id}/done",
    params(("id" = String, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "Entry is done", body = SuccessRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown queue entry", body = ErrorRes)
    )
)]
pub async fn mark_done(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessRes>> {
    state.services.queue.mark_done(&parse_id(&id)?)?;
    Ok(Json(SuccessRes { success: true }))
}

#[utoipa::path(
    delete,
    path = "/queue/{id}",
    params(("id" = String, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "Entry removed", body = SuccessRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown queue entry", body = ErrorRes)
    )
)]
pub async fn cancel(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessRes>> {
    state.services.queue.cancel(&parse_id(&id)?)?;
    Ok(Json(SuccessRes { success: true }))
}

#[utoipa::path(
    post,
    path = "/queue/reorder",
    request_body = ReorderReq,
    responses(
        (status = 200, description = "Entries renumbered in the given order", body = QueueOrderRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 500, description = "Reorder stopped part way", body = ErrorRes)
    )
)]
pub async fn reorder(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<ReorderReq>,
) -> ApiResult<Json<QueueOrderRes>> {
    let ordered = req
        .queue_entry_ids
        .iter()
        .map(|raw| parse_id(raw))
        .collect::<ApiResult<Vec<_>>>()?;
    state.services.queue.reorder(&ordered)?;
    Ok(Json(ids(ordered)))
}

#[utoipa::path(
    post,
    path = "/queue/{id}/move",
    params(("id" = String, Path, description = "Queue entry id")),
    request_body = MoveReq,
    responses(
        (status = 200, description = "Active ordering after the move", body = QueueOrderRes),
        (status = 400, description = "Unknown direction", body = ErrorRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Entry is not in the active queue", body = ErrorRes)
    )
)]
pub async fn move_entry(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveReq>,
) -> ApiResult<Json<QueueOrderRes>> {
    let direction: MoveDirection = req.direction.parse()?;
    let ordering = state.services.queue.move_entry(&parse_id(&id)?, direction)?;
    Ok(Json(ids(ordering)))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All registered patients", body = ListPatientsRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes)
    )
)]
pub async fn list_patients(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> ApiResult<Json<ListPatientsRes>> {
    let patients = state.services.views.patients()?;
    Ok(Json(ListPatientsRes {
        patients: patients.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/prescriptions",
    request_body = CreatePrescriptionReq,
    responses(
        (status = 201, description = "Prescription created as pending", body = CreatePrescriptionRes),
        (status = 400, description = "Missing diagnosis or malformed patient id", body = ErrorRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
pub async fn create_prescription(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<CreatePrescriptionReq>,
) -> ApiResult<(StatusCode, Json<CreatePrescriptionRes>)> {
    let prescription = state.services.prescriptions.create(req.into())?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePrescriptionRes {
            prescription_id: prescription.id.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/pharmacy",
    responses(
        (status = 200, description = "Pending prescriptions, newest first", body = PharmacyRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes)
    )
)]
pub async fn pharmacy(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> ApiResult<Json<PharmacyRes>> {
    let rows = state.services.views.pharmacy_worklist()?;
    Ok(Json(PharmacyRes {
        prescriptions: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{id}/dispense",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Prescription dispensed", body = SuccessRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown prescription", body = ErrorRes)
    )
)]
pub async fn dispense(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessRes>> {
    state.services.prescriptions.dispense(&parse_id(&id)?)?;
    Ok(Json(SuccessRes { success: true }))
}

#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "All medicine orders by number", body = ListOrdersRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes)
    )
)]
pub async fn list_orders(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> ApiResult<Json<ListOrdersRes>> {
    let orders = state.services.orders.list()?;
    Ok(Json(ListOrdersRes {
        orders: orders.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/collect",
    params(("id" = String, Path, description = "Medicine order id")),
    responses(
        (status = 200, description = "Order collected", body = SuccessRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes),
        (status = 404, description = "Unknown order", body = ErrorRes)
    )
)]
pub async fn collect_order(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessRes>> {
    state.services.orders.collect(&parse_id(&id)?)?;
    Ok(Json(SuccessRes { success: true }))
}

#[utoipa::path(
    get,
    path = "/logins",
    responses(
        (status = 200, description = "Login audit log, oldest first", body = ListLoginAttemptsRes),
        (status = 401, description = "Missing or invalid admin headers", body = ErrorRes)
    )
)]
pub async fn list_logins(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> ApiResult<Json<ListLoginAttemptsRes>> {
    let attempts = state.services.auth.attempts()?;
    Ok(Json(ListLoginAttemptsRes {
        attempts: attempts.into_iter().map(Into::into).collect(),
    }))
}
