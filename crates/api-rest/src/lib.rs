//! # API REST
//!
//! REST API implementation for Klinik.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, admin header checks)
//!
//! Uses `api-shared` for wire types and `klinik-core` for every operation.

#![warn(rust_2018_idioms)]

pub mod admin;
pub mod error;
pub mod handlers;

use api_shared::{
    CategoriesRes, CreateOrderReq, CreateOrderRes, CreatePrescriptionReq, CreatePrescriptionRes,
    DashboardRes, DashboardRowRes, ErrorRes, HealthRes, ListLoginAttemptsRes, ListMedicinesRes,
    ListOrdersRes, ListPatientsRes, LoginAttemptRes, LoginReq, LoginRes, MedicineRes, MoveReq,
    OrderLineReq, OrderLineRes, OrderRes, PatientRes, PharmacyRes, PrescribedMedicineDto,
    PrescriptionRes, QueueBoardRes, QueueBoardRowRes, QueueOrderRes, RegisterReq, RegisterRes,
    ReorderReq, StatusCountsRes, SuccessRes,
};
use axum::routing::{delete, get, post};
use axum::Router;
use klinik_core::ClinicServices;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server.
///
/// Wraps the core services bundle; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub services: ClinicServices,
}

impl AppState {
    pub fn new(services: ClinicServices) -> Self {
        Self { services }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::register,
        handlers::queue_board,
        handlers::login,
        handlers::list_medicines,
        handlers::list_categories,
        handlers::create_order,
        handlers::dashboard,
        handlers::approve,
        handlers::mark_done,
        handlers::cancel,
        handlers::reorder,
        handlers::move_entry,
        handlers::list_patients,
        handlers::create_prescription,
        handlers::pharmacy,
        handlers::dispense,
        handlers::list_orders,
        handlers::collect_order,
        handlers::list_logins,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        SuccessRes,
        RegisterReq,
        RegisterRes,
        PatientRes,
        ListPatientsRes,
        QueueBoardRowRes,
        QueueBoardRes,
        ReorderReq,
        MoveReq,
        QueueOrderRes,
        DashboardRowRes,
        StatusCountsRes,
        DashboardRes,
        PrescribedMedicineDto,
        CreatePrescriptionReq,
        CreatePrescriptionRes,
        PrescriptionRes,
        PharmacyRes,
        MedicineRes,
        ListMedicinesRes,
        CategoriesRes,
        OrderLineReq,
        CreateOrderReq,
        CreateOrderRes,
        OrderLineRes,
        OrderRes,
        ListOrdersRes,
        LoginReq,
        LoginRes,
        LoginAttemptRes,
        ListLoginAttemptsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full router: API routes, Swagger UI and permissive CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/queue", get(handlers::queue_board))
        .route("/queue/reorder", post(handlers::reorder))
        .route("/queue/:id", delete(handlers::cancel))
        .route("/queue/:id/approve", post(handlers::approve))
        .route("/queue/:id/done", post(handlers::mark_done))
        .route("/queue/:id/move", post(handlers::move_entry))
        .route("/login", post(handlers::login))
        .route("/logins", get(handlers::list_logins))
        .route("/dashboard", get(handlers::dashboard))
        .route("/patients", get(handlers::list_patients))
        .route("/prescriptions", post(handlers::create_prescription))
        .route("/prescriptions/:id/dispense", post(handlers::dispense))
        .route("/pharmacy", get(handlers::pharmacy))
        .route("/medicines", get(handlers::list_medicines))
        .route("/medicines/categories", get(handlers::list_categories))
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/orders/:id/collect", post(handlers::collect_order))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use klinik_core::backends::RelationalBackend;
    use klinik_core::CoreConfig;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, ClinicServices) {
        let cfg = Arc::new(CoreConfig::default());
        let store = Arc::new(RelationalBackend::open_in_memory().unwrap());
        let services = ClinicServices::new(cfg, store);
        services.catalog.seed_default_catalog().unwrap();
        (app(AppState::new(services.clone())), services)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin(mut request: Request<Body>) -> Request<Body> {
        let headers = request.headers_mut();
        headers.insert("x-username", "admin".parse().unwrap());
        headers.insert("x-password", "admin".parse().unwrap());
        request
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn read<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn alice() -> Value {
        json!({
            "full_name": "Alice Tan",
            "date_of_birth": "1990-01-01",
            "contact_number": "0812345678",
            "reason_for_visit": "Cough"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthRes = read(response).await;
        assert!(body.ok);
        assert!(body.message.contains("relational"));
    }

    #[tokio::test]
    async fn test_register_then_board() {
        let (app, _) = test_app();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/register", alice()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let receipt: RegisterRes = read(response).await;
        assert_eq!(receipt.queue_number, 1);
        assert_eq!(receipt.estimated_wait_time, 15);

        let board: QueueBoardRes = read(app.oneshot(get("/queue")).await.unwrap()).await;
        assert_eq!(board.rows.len(), 1);
        assert_eq!(board.rows[0].patient_initials, "A.T.");
        assert_eq!(board.rows[0].estimated_wait, Some(15));
        assert_eq!(board.waiting, 1);
    }

    #[tokio::test]
    async fn test_register_missing_field_is_bad_request() {
        let (app, services) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/register",
                json!({"full_name": "Alice Tan", "date_of_birth": "1990-01-01"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorRes = read(response).await;
        assert!(body.message.contains("contact_number"));
        assert!(services.views.patients().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_routes_require_headers() {
        let (app, _) = test_app();

        let response = app.clone().oneshot(get("/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut wrong = get("/dashboard");
        wrong
            .headers_mut()
            .insert("x-username", "admin".parse().unwrap());
        wrong
            .headers_mut()
            .insert("x-password", "nope".parse().unwrap());
        let response = app.clone().oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(admin(get("/dashboard"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_approve_and_dashboard_hidden_before() {
        let (app, _) = test_app();
        let receipt: RegisterRes = read(
            app.clone()
                .oneshot(json_request("POST", "/register", alice()))
                .await
                .unwrap(),
        )
        .await;

        let uri = format!("/queue/{}/approve", receipt.queue_entry_id);
        let response = app
            .clone()
            .oneshot(admin(json_request("POST", &uri, json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let dashboard: DashboardRes =
            read(app.clone().oneshot(admin(get("/dashboard"))).await.unwrap()).await;
        assert_eq!(dashboard.counts.being_examined, 1);
        assert_eq!(dashboard.queue[0].status_label, "Being Examined");
        assert!(dashboard.queue[0].called_at.is_some());

        let hidden: DashboardRes = read(
            app.oneshot(admin(get(
                "/dashboard?hidden_before=2999-01-01T00:00:00Z",
            )))
            .await
            .unwrap(),
        )
        .await;
        assert!(hidden.queue.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let (app, _) = test_app();

        let missing = format!("/queue/{}/done", klinik_core::RecordId::new());
        let response = app
            .clone()
            .oneshot(admin(json_request("POST", &missing, json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(admin(json_request("POST", "/queue/not-an-id/done", json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_records_every_attempt() {
        let (app, services) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/login",
                json!({"username": "admin", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/login",
                json!({"username": "admin", "password": "admin"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let logins: ListLoginAttemptsRes =
            read(app.oneshot(admin(get("/logins"))).await.unwrap()).await;
        let statuses: Vec<_> = logins.attempts.iter().map(|a| a.status.as_str()).collect();
        assert_eq!(statuses, ["failed", "success"]);
        assert_eq!(services.auth.attempts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prescription_to_pharmacy_to_dispense() {
        let (app, _) = test_app();
        let receipt: RegisterRes = read(
            app.clone()
                .oneshot(json_request("POST", "/register", alice()))
                .await
                .unwrap(),
        )
        .await;

        let response = app
            .clone()
            .oneshot(admin(json_request(
                "POST",
                "/prescriptions",
                json!({
                    "patient_id": receipt.patient_id,
                    "diagnosis": "Common cold",
                    "medicines": [
                        {"medicine_name": "Paracetamol", "dosage": "500mg", "frequency": "3x daily", "duration": "5 days"},
                        {"medicine_name": ""}
                    ]
                }),
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreatePrescriptionRes = read(response).await;

        let worklist: PharmacyRes =
            read(app.clone().oneshot(admin(get("/pharmacy"))).await.unwrap()).await;
        assert_eq!(worklist.prescriptions.len(), 1);
        assert_eq!(worklist.prescriptions[0].patient_name, "Alice Tan");
        assert_eq!(worklist.prescriptions[0].medicines.len(), 1);

        let uri = format!("/prescriptions/{}/dispense", created.prescription_id);
        let response = app
            .clone()
            .oneshot(admin(json_request("POST", &uri, json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let worklist: PharmacyRes = read(app.oneshot(admin(get("/pharmacy"))).await.unwrap()).await;
        assert!(worklist.prescriptions.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_and_orders() {
        let (app, _) = test_app();

        let found: ListMedicinesRes = read(
            app.clone()
                .oneshot(get("/medicines?text=para"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(found.medicines.len(), 1);
        let paracetamol = &found.medicines[0];

        let categories: CategoriesRes =
            read(app.clone().oneshot(get("/medicines/categories")).await.unwrap()).await;
        assert!(categories.categories.contains(&paracetamol.category));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/orders", json!({"items": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/orders",
                json!({"items": [{"medicine_id": paracetamol.id, "quantity": 2}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let order: CreateOrderRes = read(response).await;
        assert_eq!(order.order_number, 1);
        assert_eq!(order.total, paracetamol.price * 2);

        let uri = format!("/orders/{}/collect", order.order_id);
        let response = app
            .clone()
            .oneshot(admin(json_request("POST", &uri, json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let orders: ListOrdersRes = read(app.oneshot(admin(get("/orders"))).await.unwrap()).await;
        assert_eq!(orders.orders[0].status, "collected");
    }
}
