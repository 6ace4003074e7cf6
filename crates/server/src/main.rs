use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use server_api::{
    available_slots, available_slots_for_round, book_slot, cancel_booking, schedule_overview,
    ApiContext,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        AvailableSlotsQuery, AvailableSlotsRequest, AvailableSlotsResponse, BookingRequest,
        BookingResponse, CancelRequest, CancelResponse, ScheduleOverview, AVAILABLE_SLOTS_ROUTE,
        BOOKINGS_ROUTE, CANCEL_ROUTE, SCHEDULE_ROUTE,
    },
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        rules: settings.rules,
    };
    info!(mentors = api.rules.mentors.len(), "booking rules loaded");

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            AVAILABLE_SLOTS_ROUTE,
            get(http_available_slots).post(http_available_slots_for_round),
        )
        .route(SCHEDULE_ROUTE, get(http_schedule))
        .route(BOOKINGS_ROUTE, post(http_book_slot))
        .route(CANCEL_ROUTE, post(http_cancel_booking))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn http_available_slots(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AvailableSlotsQuery>,
) -> ApiResult<AvailableSlotsResponse> {
    let slots = available_slots(&state.api, q.mentor.as_deref(), q.date.as_deref())
        .await
        .map_err(into_response)?;
    debug!(mentor = ?q.mentor, date = ?q.date, count = slots.len(), "served available slots");
    Ok(Json(AvailableSlotsResponse {
        available_slots: slots,
    }))
}

async fn http_available_slots_for_round(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AvailableSlotsRequest>,
) -> ApiResult<AvailableSlotsResponse> {
    let slots = available_slots_for_round(&state.api, &req)
        .await
        .map_err(into_response)?;
    debug!(mentor = %req.mentor, date = %req.date, round = %req.round, count = slots.len(), "served round slots");
    Ok(Json(AvailableSlotsResponse {
        available_slots: slots,
    }))
}

async fn http_schedule(State(state): State<Arc<AppState>>) -> ApiResult<ScheduleOverview> {
    let today = Local::now().date_naive();
    schedule_overview(&state.api, today)
        .await
        .map(Json)
        .map_err(into_response)
}

async fn http_book_slot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> ApiResult<BookingResponse> {
    book_slot(&state.api, &req)
        .await
        .map(Json)
        .map_err(into_response)
}

async fn http_cancel_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<CancelResponse> {
    cancel_booking(&state.api, &req.unique_code)
        .await
        .map(Json)
        .map_err(into_response)
}

fn into_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => {
            error!(message = %err.message, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
