use crate::backend::AvailabilityBackend;
use crate::configuration::Configuration;
use crate::error::StoreError;
use crate::types::{AvailabilitySlot, BatchOutcome, Property, Seller, SlotRange};
use crate::AppState;
use axum::extract::{Path, Query};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, http::StatusCode, Json};
use axum::{routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct CreateAvailabilityRequest {
    property_id: Uuid,
    seller_id: Uuid,
    #[validate(length(min = 1), nested)]
    slots: Vec<SlotRange>,
}

/// `seller_id` is optional and may arrive empty from the calendar frontend.
#[derive(Debug, Clone, Default, Deserialize)]
struct SellerFilter {
    #[serde(alias = "sellerId")]
    seller_id: Option<String>,
}

impl SellerFilter {
    fn seller_id(&self) -> Result<Option<Uuid>, ApiError> {
        match self.seller_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(seller_id) => Uuid::parse_str(seller_id)
                .map(Some)
                .map_err(|err| ApiError::Validation(format!("seller_id: {err}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DeletedAvailability {
    message: String,
    deleted_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RemovedSlot {
    message: String,
    id: Uuid,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Store(err) => match err {
                StoreError::ConnectionFailure(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Database connection failed")
                }
                StoreError::DuplicateSlot => (StatusCode::CONFLICT, "Availability already recorded"),
                StoreError::ConstraintViolation(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid reference data")
                }
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Availability not found"),
                StoreError::Migration(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred",
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Store calls block on the database, so they run off the async workers.
async fn run_blocking<T, R, F>(backend: T, operation: F) -> Result<R, ApiError>
where
    T: AvailabilityBackend,
    R: Send + 'static,
    F: FnOnce(T) -> Result<R, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(backend))
        .await
        .map_err(|err| {
            error!(?err, "Store task failed to complete");
            ApiError::Internal(err.to_string())
        })?
        .map_err(ApiError::from)
}

fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(?err, %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    info!(?origins, "CORS restricted to configured origins");
    cors.allow_origin(AllowOrigin::list(origins))
}

pub fn create_app<T: AvailabilityBackend, C: Configuration>(backend: T, configuration: &C) -> Router {
    let state = AppState { backend };

    Router::new()
        .route("/health", get(health_check::<T>))
        .route("/availability", post(create_availability::<T>))
        .route(
            "/availability/property/:property_id",
            get(get_property_availability::<T>).delete(delete_property_availability::<T>),
        )
        .route("/availability/seller/:seller_id", get(get_seller_availability::<T>))
        .route(
            "/availability/:id",
            get(get_availability_slot::<T>).delete(remove_availability_slot::<T>),
        )
        .route("/sellers/:id", get(get_seller::<T>))
        .route("/properties/:id", get(get_property::<T>))
        .with_state(state)
        .layer(cors_layer(configuration.allowed_origins()))
        .layer(TraceLayer::new_for_http())
}

async fn health_check<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
) -> Result<impl IntoResponse, ApiError> {
    let timestamp = run_blocking(state.backend, |backend| backend.health_check()).await?;
    Ok(Json(json!({ "status": "ok", "timestamp": timestamp })))
}

async fn create_availability<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<(StatusCode, Json<BatchOutcome>), ApiError> {
    request
        .validate()
        .map_err(|err| ApiError::Validation(err.to_string()))?;

    let outcome = run_blocking(state.backend, move |backend| {
        backend.save_availability_batch(request.property_id, request.seller_id, &request.slots)
    })
    .await?;
    info!(
        successful = outcome.successful_slots,
        duplicates = outcome.duplicate_slots,
        "Availability saved"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn get_property_availability<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(property_id): Path<Uuid>,
    Query(filter): Query<SellerFilter>,
) -> Result<Json<Vec<AvailabilitySlot>>, ApiError> {
    let seller_id = filter.seller_id()?;
    let slots = run_blocking(state.backend, move |backend| {
        backend.availability(property_id, seller_id)
    })
    .await?;
    Ok(Json(slots))
}

async fn delete_property_availability<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(property_id): Path<Uuid>,
    Query(filter): Query<SellerFilter>,
) -> Result<Json<DeletedAvailability>, ApiError> {
    let seller_id = filter.seller_id()?;
    let deleted_count = run_blocking(state.backend, move |backend| {
        backend.delete_availability(property_id, seller_id)
    })
    .await?;
    Ok(Json(DeletedAvailability {
        message: format!("Deleted {deleted_count} availability slots"),
        deleted_count,
    }))
}

async fn get_seller_availability<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(seller_id): Path<Uuid>,
) -> Result<Json<Vec<AvailabilitySlot>>, ApiError> {
    let slots = run_blocking(state.backend, move |backend| {
        backend.seller_availability(seller_id)
    })
    .await?;
    Ok(Json(slots))
}

async fn get_availability_slot<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailabilitySlot>, ApiError> {
    let slot = run_blocking(state.backend, move |backend| backend.availability_slot(id)).await?;
    Ok(Json(slot))
}

async fn remove_availability_slot<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RemovedSlot>, ApiError> {
    let id = run_blocking(state.backend, move |backend| {
        backend.remove_availability_slot(id)
    })
    .await?;
    Ok(Json(RemovedSlot {
        message: "Availability slot deleted".into(),
        id,
    }))
}

async fn get_seller<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Seller>, ApiError> {
    run_blocking(state.backend, move |backend| backend.seller(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Seller {id}")))
}

async fn get_property<T: AvailabilityBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Property>, ApiError> {
    run_blocking(state.backend, move |backend| backend.property(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Property {id}")))
}
