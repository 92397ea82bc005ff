//! Region filtering and per-product resolution endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use pickupdb_core::PickupLocation;
use pickupdb_engine::{FilterOutcome, Resolution};

use crate::middleware::RequestId;

use super::{map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct FilterQuery {
    region: Option<String>,
}

/// `GET /api/v1/filter?region=` over the startup catalog snapshot.
///
/// Unknown or missing region input falls back to the `all` wildcard, so a
/// bad query widens the result instead of refusing it.
pub(super) async fn filter_catalog(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilterQuery>,
) -> Json<ApiResponse<FilterOutcome>> {
    let region = query.region.as_deref().unwrap_or("all");
    let data = state.filter.filter_products(region, &state.catalog).await;

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

/// `GET /api/v1/products/{code}/pickups` resolves one catalog product.
pub(super) async fn product_pickups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Resolution>>, ApiError> {
    let product = state
        .catalog
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(&code))
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("product '{code}' is not in the catalog"),
            )
        })?;

    let data = state.filter.resolve(product).await;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct LocationData {
    pub product_code: String,
    pub location: PickupLocation,
}

/// `GET /api/v1/locations/{name}` finds a pickup location by exact
/// (case-insensitive) name across all cached records.
pub(super) async fn location_by_name(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<LocationData>>, ApiError> {
    let hit = state
        .filter
        .location_by_name(&name)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no cached pickup location named '{name}'"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: LocationData {
            product_code: hit.product_code,
            location: hit.location,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
