use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use server::carpool::{
    assign_passengers, confirm_pickup, create_carpool_route, passenger_respond, CarpoolError,
};
use server::stores::{CarpoolRouteStore, RouteStop, ValidationStore};
use server::today::get_today;

struct AppState {
    validations: ValidationStore,
    carpool_routes: CarpoolRouteStore,
}

#[tokio::main]
pub async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let state = Arc::new(AppState {
        validations: ValidationStore::new(),
        carpool_routes: CarpoolRouteStore::new(),
    });

    let app = axum::Router::new()
        .fallback(axum::routing::get(|| async {
            "No Route! Use /health, /plan or /today"
        }))
        .route("/health", get(healthy))
        .route("/plan", post(plan))
        .route("/today", get(today))
        .route("/validate", post(validate))
        .route("/carpool/route", post(carpool_route))
        .route("/carpool/assign", post(carpool_assign))
        .route("/carpool/respond", post(carpool_respond))
        .route("/carpool/pickup", post(carpool_pickup))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    println!("Server running on port 3000 (http://localhost:3000/health)");
    axum::serve(listener, app).await.unwrap();
}

pub async fn healthy() -> &'static str {
    "Healthy"
}

async fn plan(Json(input_data): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
    match server::plan_instance(input_data) {
        Ok(output) => (StatusCode::OK, Json(output)),
        Err(error) => (
            as_status(server::status_for_error(&error)),
            Json(json!({"error": error.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct TodayParams {
    user_id: String,
    date: Option<String>,
    role: Option<String>,
}

async fn today(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TodayParams>,
) -> Json<serde_json::Value> {
    let date = params.date.unwrap_or_else(server::today_date_string);
    let role = params.role.unwrap_or_else(|| "passenger".to_string());
    Json(get_today(
        &params.user_id,
        &date,
        &role,
        &state.validations,
        &state.carpool_routes,
    ))
}

#[derive(Deserialize)]
struct ValidateRequest {
    user_id: String,
    trip_type: String,
    validated_by: String,
}

async fn validate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> Json<serde_json::Value> {
    state
        .validations
        .record(&request.user_id, &request.trip_type, "confirmed");
    Json(json!({
        "user_id": request.user_id,
        "trip_type": request.trip_type,
        "status": "confirmed",
        "validated_by": request.validated_by,
    }))
}

#[derive(Deserialize)]
struct CreateRouteRequest {
    driver_id: String,
    capacity: u32,
    #[serde(default)]
    stops: Vec<RouteStop>,
    date: String,
    time: String,
}

async fn carpool_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRouteRequest>,
) -> Json<serde_json::Value> {
    let route = create_carpool_route(
        &state.carpool_routes,
        &request.driver_id,
        request.capacity,
        request.stops,
        &request.date,
        &request.time,
    );
    Json(json!(route))
}

#[derive(Deserialize)]
struct AssignRequest {
    driver_id: String,
    passengers: Vec<String>,
}

async fn carpool_assign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    respond_with(assign_passengers(
        &state.carpool_routes,
        &request.driver_id,
        &request.passengers,
    ))
}

#[derive(Deserialize)]
struct RespondRequest {
    driver_id: String,
    passenger_id: String,
    response: String,
}

async fn carpool_respond(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RespondRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let accept = match request.response.as_str() {
        "accepted" => true,
        "rejected" => false,
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": format!("response must be 'accepted' or 'rejected', got {:?}", other)
                })),
            )
        }
    };
    respond_with(passenger_respond(
        &state.carpool_routes,
        &request.driver_id,
        &request.passenger_id,
        accept,
    ))
}

#[derive(Deserialize)]
struct PickupRequest {
    driver_id: String,
    passenger_id: String,
}

async fn carpool_pickup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PickupRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    respond_with(confirm_pickup(
        &state.carpool_routes,
        &request.driver_id,
        &request.passenger_id,
    ))
}

fn respond_with(
    result: Result<server::stores::CarpoolRouteRecord, CarpoolError>,
) -> (StatusCode, Json<serde_json::Value>) {
    match result {
        Ok(route) => (StatusCode::OK, Json(json!(route))),
        Err(error) => {
            let status = match &error {
                CarpoolError::RouteNotFound(_) | CarpoolError::PassengerNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CarpoolError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            };
            (status, Json(json!({"error": error.to_string()})))
        }
    }
}

fn as_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
